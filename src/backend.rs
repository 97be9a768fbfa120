use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::common::{create_path_if_not_exists, write_string_to_file};
use crate::config::RenderOptions;
use crate::errors::RenderBackendError;
use crate::export::{to_dot, to_mermaid, OutputFormat};
use crate::graph::RenderedGraph;

/// Turns a styled graph into a file on disk
pub trait RenderBackend {
    fn name(&self) -> &str;

    fn supports(&self, format: OutputFormat) -> bool;

    fn render(
        &self,
        graph: &RenderedGraph,
        options: &RenderOptions,
        format: OutputFormat,
        output: &Path,
    ) -> Result<(), RenderBackendError>;
}

/// Writes DOT or Mermaid source text
#[derive(Debug, Clone, Copy, Default)]
pub struct TextBackend;

impl RenderBackend for TextBackend {
    fn name(&self) -> &str {
        "text"
    }

    fn supports(&self, format: OutputFormat) -> bool {
        format.is_text()
    }

    fn render(
        &self,
        graph: &RenderedGraph,
        options: &RenderOptions,
        format: OutputFormat,
        output: &Path,
    ) -> Result<(), RenderBackendError> {
        let content = match format {
            OutputFormat::Dot => to_dot::render(graph, options)?,
            OutputFormat::Mermaid => to_mermaid::render(graph, options)?,
            other => return Err(RenderBackendError::UnsupportedFormat(other.to_string())),
        };
        write_string_to_file(output, &content)
    }
}

/// Pipes DOT source into the Graphviz `dot` executable
#[derive(Debug, Clone)]
pub struct GraphvizBackend {
    executable: PathBuf,
}

impl Default for GraphvizBackend {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("dot"),
        }
    }
}

impl GraphvizBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_executable<P: Into<PathBuf>>(mut self, executable: P) -> Self {
        self.executable = executable.into();
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Whether the executable answers `-V`
    pub fn is_available(&self) -> bool {
        Command::new(&self.executable)
            .arg("-V")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn run(&self, dot_source: &str, format: &str, output: &Path) -> Result<(), RenderBackendError> {
        debug!(
            "Running {} -T{} -o {}",
            self.executable.display(),
            format,
            output.display()
        );

        let mut child = Command::new(&self.executable)
            .arg(format!("-T{}", format))
            .arg("-o")
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                    RenderBackendError::GraphvizUnavailable {
                        executable: self.executable.clone(),
                    }
                }
                _ => RenderBackendError::io(&self.executable, e),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // dot may exit early on bad input; its stderr explains why
            if let Err(e) = stdin.write_all(dot_source.as_bytes()) {
                debug!("Writing to graphviz stdin failed: {}", e);
            }
        }

        let result = child
            .wait_with_output()
            .map_err(|e| RenderBackendError::io(&self.executable, e))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            warn!("Graphviz exited with {}: {}", result.status, stderr);
            return Err(RenderBackendError::GraphvizFailed {
                status: result.status.to_string(),
                stderr,
            });
        }
        Ok(())
    }
}

impl RenderBackend for GraphvizBackend {
    fn name(&self) -> &str {
        "graphviz"
    }

    fn supports(&self, format: OutputFormat) -> bool {
        format.graphviz_name().is_some()
    }

    fn render(
        &self,
        graph: &RenderedGraph,
        options: &RenderOptions,
        format: OutputFormat,
        output: &Path,
    ) -> Result<(), RenderBackendError> {
        let graphviz_format = format
            .graphviz_name()
            .ok_or_else(|| RenderBackendError::UnsupportedFormat(format.to_string()))?;
        let dot_source = to_dot::render(graph, options)?;
        create_path_if_not_exists(output)?;
        self.run(&dot_source, graphviz_format, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LayerCategory, LayerInfo, ModelDescription};
    use crate::style::StyleRules;

    fn graph() -> RenderedGraph {
        let model = ModelDescription::new("tiny")
            .layer(LayerInfo::new("in", LayerCategory::Input))
            .layer(LayerInfo::new("out", LayerCategory::Dense).with_inputs(["in"]));
        RenderedGraph::from_model(&model, StyleRules::builtin()).unwrap()
    }

    #[test]
    fn test_supported_formats() {
        assert!(TextBackend.supports(OutputFormat::Dot));
        assert!(!TextBackend.supports(OutputFormat::Png));
        let graphviz = GraphvizBackend::new();
        assert!(graphviz.supports(OutputFormat::Svg));
        assert!(!graphviz.supports(OutputFormat::Mermaid));
        assert_eq!(graphviz.executable(), Path::new("dot"));
    }

    #[test]
    fn test_text_backend_writes_dot() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("tiny.dot");
        TextBackend
            .render(&graph(), &RenderOptions::default(), OutputFormat::Dot, &output)
            .unwrap();
        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("\"in\" -> \"out\";"));
    }

    #[test]
    fn test_text_backend_rejects_image_formats() {
        let dir = tempfile::tempdir().unwrap();
        let err = TextBackend
            .render(
                &graph(),
                &RenderOptions::default(),
                OutputFormat::Png,
                &dir.path().join("tiny.png"),
            )
            .unwrap_err();
        assert!(matches!(err, RenderBackendError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_executable_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let backend = GraphvizBackend::new().with_executable(dir.path().join("no-such-dot"));
        assert!(!backend.is_available());
        let err = backend
            .render(
                &graph(),
                &RenderOptions::default(),
                OutputFormat::Png,
                &dir.path().join("tiny.png"),
            )
            .unwrap_err();
        assert!(matches!(err, RenderBackendError::GraphvizUnavailable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_carries_stderr() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("failing-dot");
        std::fs::write(
            &script,
            "#!/bin/sh\necho \"Error: <stdin>: syntax error in line 1\" >&2\nexit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let backend = GraphvizBackend::new().with_executable(&script);
        let err = backend
            .render(
                &graph(),
                &RenderOptions::default(),
                OutputFormat::Svg,
                &dir.path().join("tiny.svg"),
            )
            .unwrap_err();
        match err {
            RenderBackendError::GraphvizFailed { stderr, .. } => {
                assert_eq!(stderr, "Error: <stdin>: syntax error in line 1");
            }
            other => panic!("expected GraphvizFailed, got {:?}", other),
        }
    }
}
