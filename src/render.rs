use std::path::{Path, PathBuf};

use tracing::info;

use crate::backend::{GraphvizBackend, RenderBackend, TextBackend};
use crate::config::{RenderOptions, RenderProfile};
use crate::errors::{ConfigError, NetvisError};
use crate::export::OutputFormat;
use crate::graph::RenderedGraph;
use crate::model::ModelIntrospection;
use crate::style::StyleRules;

/// What a successful render produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub node_count: usize,
    pub edge_count: usize,
}

/// Style rules, layout options and the Graphviz backend used for a render
#[derive(Debug, Clone)]
pub struct Renderer {
    styles: StyleRules,
    options: RenderOptions,
    graphviz: GraphvizBackend,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            styles: StyleRules::builtin().clone(),
            options: RenderOptions::default(),
            graphviz: GraphvizBackend::default(),
        }
    }

    /// Uses `styles` as given, after normalising and checking its colours
    pub fn with_styles(mut self, styles: StyleRules) -> Result<Self, ConfigError> {
        self.styles = styles.validated()?;
        Ok(self)
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_graphviz(mut self, graphviz: GraphvizBackend) -> Self {
        self.graphviz = graphviz;
        self
    }

    pub fn from_profile(profile: &RenderProfile) -> Result<Self, ConfigError> {
        Ok(Self::new()
            .with_styles(profile.get_style_rules()?)?
            .with_options(profile.get_render_options()))
    }

    pub fn styles(&self) -> &StyleRules {
        &self.styles
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Draws the layer graph of `model` into `output_path`.
    ///
    /// The format is taken from the extension of `output_path`. The file is
    /// overwritten if it exists.
    pub fn render<M: ModelIntrospection + ?Sized>(
        &self,
        model: &M,
        output_path: impl AsRef<Path>,
    ) -> Result<RenderOutput, NetvisError> {
        let output_path = output_path.as_ref();
        let format = OutputFormat::from_path(output_path)?;
        info!("Rendering model to {} as {}", output_path.display(), format);

        let mut graph =
            RenderedGraph::from_model_with(model, &self.styles, self.options.expand_nested)?;
        graph.apply_labels(self.options.show_class_names, self.options.show_shapes);
        graph.topological_order()?;

        self.write(&graph, format, output_path)
    }

    /// Draws one swatch per style rule, `columns` per row
    pub fn render_legend(
        &self,
        output_path: impl AsRef<Path>,
        columns: usize,
    ) -> Result<RenderOutput, NetvisError> {
        let output_path = output_path.as_ref();
        let format = OutputFormat::from_path(output_path)?;
        info!("Rendering legend to {} as {}", output_path.display(), format);

        let graph = RenderedGraph::legend(&self.styles, columns);
        self.write(&graph, format, output_path)
    }

    fn write(
        &self,
        graph: &RenderedGraph,
        format: OutputFormat,
        output_path: &Path,
    ) -> Result<RenderOutput, NetvisError> {
        let backend: &dyn RenderBackend = if format.is_text() {
            &TextBackend
        } else {
            &self.graphviz
        };
        backend.render(graph, &self.options, format, output_path)?;

        let output = RenderOutput {
            path: output_path.to_path_buf(),
            format,
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
        };
        info!(
            "Wrote {} nodes and {} edges to {} using the {} backend",
            output.node_count,
            output.edge_count,
            output.path.display(),
            backend.name()
        );
        Ok(output)
    }
}

/// Renders `model` with the given rules, or the built-in rules when `None`
pub fn render<M: ModelIntrospection + ?Sized>(
    model: &M,
    output_path: impl AsRef<Path>,
    style_rules: Option<&StyleRules>,
) -> Result<RenderOutput, NetvisError> {
    renderer_for(style_rules)?.render(model, output_path)
}

pub fn render_legend(
    output_path: impl AsRef<Path>,
    style_rules: Option<&StyleRules>,
    columns: usize,
) -> Result<RenderOutput, NetvisError> {
    renderer_for(style_rules)?.render_legend(output_path, columns)
}

fn renderer_for(style_rules: Option<&StyleRules>) -> Result<Renderer, ConfigError> {
    match style_rules {
        Some(rules) => Renderer::new().with_styles(rules.clone()),
        None => Ok(Renderer::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderOptionsConfig;
    use crate::errors::RenderBackendError;
    use crate::model::{LayerCategory, LayerInfo, ModelDescription};
    use crate::style::NodeStyle;

    fn model() -> ModelDescription {
        ModelDescription::new("small")
            .layer(LayerInfo::new("in", LayerCategory::Input))
            .layer(
                LayerInfo::new("conv", LayerCategory::Convolution)
                    .with_class_name("Conv2D")
                    .with_inputs(["in"]),
            )
    }

    #[test]
    fn test_render_reports_counts() {
        let dir = tempfile::tempdir().unwrap();
        let output = render(&model(), dir.path().join("small.dot"), None).unwrap();
        assert_eq!(output.format, OutputFormat::Dot);
        assert_eq!(output.node_count, 2);
        assert_eq!(output.edge_count, 1);
        assert!(output.path.exists());
    }

    #[test]
    fn test_unknown_extension_fails_before_reading_model() {
        let dir = tempfile::tempdir().unwrap();
        let err = render(&model(), dir.path().join("small.bmp"), None).unwrap_err();
        assert!(matches!(
            err,
            NetvisError::RenderBackend(RenderBackendError::UnsupportedFormat(_))
        ));
        assert!(!dir.path().join("small.bmp").exists());
    }

    #[test]
    fn test_show_class_names_option() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.dot");
        let options = RenderOptionsConfig {
            show_class_names: Some(true),
            ..Default::default()
        }
        .resolve();
        Renderer::new()
            .with_options(options)
            .render(&model(), &path)
            .unwrap();
        let dot = std::fs::read_to_string(&path).unwrap();
        assert!(dot.contains("label=\"conv\\nConv2D\""));
    }

    #[test]
    fn test_from_profile_applies_overrides() {
        let profile = RenderProfile::from_yaml_str(
            r#"
options:
  orientation: LR
styles:
  rules:
    convolution:
      fill_color: "000000"
"#,
        )
        .unwrap();
        let renderer = Renderer::from_profile(&profile).unwrap();
        assert_eq!(
            renderer.styles().resolve(&LayerCategory::Convolution).fill_color,
            "#000000"
        );
        assert_eq!(renderer.options().orientation.as_str(), "LR");
    }

    #[test]
    fn test_code_built_styles_are_normalised() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.dot");
        let rules = StyleRules::builtin()
            .clone()
            .with_rule(LayerCategory::Convolution, NodeStyle::filled("C66AA7"));
        render(&model(), &path, Some(&rules)).unwrap();

        let dot = std::fs::read_to_string(&path).unwrap();
        assert!(dot.contains("fillcolor=\"#c66aa7\""));
        assert!(!dot.contains("C66AA7"));
    }

    #[test]
    fn test_invalid_code_built_styles_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.dot");
        let rules = StyleRules::empty().with_rule(LayerCategory::Dense, NodeStyle::filled("#zzz"));

        assert!(matches!(
            Renderer::new().with_styles(rules.clone()),
            Err(ConfigError::InvalidColour { .. })
        ));
        let err = render(&model(), &path, Some(&rules)).unwrap_err();
        assert!(matches!(
            err,
            NetvisError::Config(ConfigError::InvalidColour { .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_expand_nested_and_shapes_options() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested.dot");
        let inner = ModelDescription::new("block")
            .layer(LayerInfo::new("x", LayerCategory::Input).with_shapes(None, Some("(None, 4)")))
            .layer(LayerInfo::new("y", LayerCategory::Dense).with_inputs(["x"]));
        let nested = ModelDescription::new("outer")
            .layer(LayerInfo::new("in", LayerCategory::Input))
            .layer(
                LayerInfo::new("block", LayerCategory::Model)
                    .with_submodel(inner)
                    .with_inputs(["in"]),
            );
        let options = RenderOptionsConfig {
            expand_nested: Some(true),
            show_shapes: Some(true),
            ..Default::default()
        }
        .resolve();
        let output = Renderer::new()
            .with_options(options)
            .render(&nested, &path)
            .unwrap();

        assert_eq!(output.node_count, 3);
        assert_eq!(output.edge_count, 2);
        let dot = std::fs::read_to_string(&path).unwrap();
        assert!(dot.contains("subgraph \"cluster_block\" {"));
        assert!(dot.contains("\"in\" -> \"block/x\";"));
        assert!(dot.contains("[label=\"x\\ninput: ?\\noutput: (None, 4)\""));
    }
}
