use handlebars::{handlebars_helper, Handlebars};
use serde_json::Value;
use tracing::{debug, error};

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::errors::RenderBackendError;

pub fn create_path_if_not_exists(path: &Path) -> Result<(), RenderBackendError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if !parent.as_os_str().is_empty() && !parent.exists() {
        debug!("Creating path: {:?}", parent);
        std::fs::create_dir_all(parent).map_err(|e| RenderBackendError::io(parent, e))?;
    }
    Ok(())
}

pub fn write_string_to_file(path: &Path, content: &str) -> Result<(), RenderBackendError> {
    create_path_if_not_exists(path)?;
    let mut file = File::create(path).map_err(|e| RenderBackendError::io(path, e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| RenderBackendError::io(path, e))?;
    Ok(())
}

/// Escapes text for a double-quoted DOT string
pub fn dot_escape(data: &str) -> String {
    let mut escaped = String::with_capacity(data.len());
    for c in data.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escapes text for a quoted Mermaid label
pub fn mermaid_escape(data: &str) -> String {
    data.replace('"', "#quot;").replace('\n', "<br/>")
}

pub fn get_handlebars() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();

    handlebars_helper!(exists: |v: Value| {
        match v {
            serde_json::Value::Null => false,
            serde_json::Value::String(s) => {
                let trimmed = s.trim();
                !trimmed.is_empty() && trimmed != "null"
            }
            _ => true,
        }
    });
    handlebars.register_helper("exists", Box::new(exists));

    handlebars_helper!(dot_clusters: |clusters: Value| {
        fn render_cluster(cluster: &Value, acc: usize) -> String {
            let Value::Object(map) = cluster else {
                error!("Expected cluster object, got: {:?}", cluster);
                return String::new();
            };
            let id = map.get("id").and_then(|v| v.as_str()).unwrap_or("no-id");
            let label = map.get("label").and_then(|v| v.as_str()).unwrap_or(id);
            let indent = "  ".repeat(acc);

            let mut lines = vec![
                format!("{}subgraph \"cluster_{}\" {{", indent, dot_escape(id)),
                format!(
                    "{}  style=\"dashed\"; label=\"{}\"; labeljust=\"l\";",
                    indent,
                    dot_escape(label)
                ),
            ];
            for node in children(map, "nodes") {
                if let Some(node_id) = node.get("id").and_then(|v| v.as_str()) {
                    lines.push(format!("{}  \"{}\";", indent, dot_escape(node_id)));
                }
            }
            for child in children(map, "clusters") {
                lines.push(render_cluster(child, acc + 1));
            }
            lines.push(format!("{}}}", indent));
            lines.join("\n")
        }

        cluster_list(&clusters)
            .iter()
            .map(|cluster| render_cluster(cluster, 1))
            .collect::<Vec<_>>()
            .join("\n")
    });
    handlebars.register_helper("dot_clusters", Box::new(dot_clusters));

    handlebars_helper!(mermaid_clusters: |clusters: Value| {
        fn render_cluster(cluster: &Value, acc: usize) -> String {
            let Value::Object(map) = cluster else {
                error!("Expected cluster object, got: {:?}", cluster);
                return String::new();
            };
            let key = map.get("key").and_then(|v| v.as_str()).unwrap_or("no-key");
            let label = map.get("label").and_then(|v| v.as_str()).unwrap_or(key);
            let indent = "  ".repeat(acc);

            let mut lines = vec![format!(
                "{}subgraph {}[\"{}\"]",
                indent,
                key,
                mermaid_escape(label)
            )];
            for node in children(map, "nodes") {
                if let Some(node_key) = node.get("key").and_then(|v| v.as_str()) {
                    lines.push(format!("{}  {}", indent, node_key));
                }
            }
            for child in children(map, "clusters") {
                lines.push(render_cluster(child, acc + 1));
            }
            lines.push(format!("{}end", indent));
            lines.join("\n")
        }

        cluster_list(&clusters)
            .iter()
            .map(|cluster| render_cluster(cluster, 1))
            .collect::<Vec<_>>()
            .join("\n")
    });
    handlebars.register_helper("mermaid_clusters", Box::new(mermaid_clusters));

    handlebars
}

fn cluster_list(clusters: &Value) -> &[Value] {
    clusters.as_array().map(Vec::as_slice).unwrap_or(&[])
}

fn children<'v>(map: &'v serde_json::Map<String, Value>, field: &str) -> &'v [Value] {
    map.get(field)
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Registry whose `{{value}}` output is safe inside DOT double quotes
pub fn get_dot_handlebars() -> Handlebars<'static> {
    let mut handlebars = get_handlebars();
    handlebars.register_escape_fn(dot_escape);
    handlebars
}

/// Registry whose `{{value}}` output is safe inside Mermaid labels
pub fn get_mermaid_handlebars() -> Handlebars<'static> {
    let mut handlebars = get_handlebars();
    handlebars.register_escape_fn(mermaid_escape);
    handlebars
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn handlebars_can_iterate_objects() {
        let handlebars = get_handlebars();
        let res = handlebars
            .render_template(
                r#"{{#each layers as |layer|}}
Layer {{layer.name}}
{{/each}}"#,
                &json!({"layers": [
                {
                    "name": "conv1"
                },
                {
                    "name": "pool1"
                }
                ]}),
            )
            .expect("This to render");
        assert_eq!(res, "Layer conv1\nLayer pool1\n");
    }

    #[test]
    fn handlebars_helper_exists_can_render() {
        let handlebars = get_handlebars();
        let res = handlebars
            .render_template(
                r#"{{#if (exists title)}}label="{{title}}";{{/if}}{{#if (exists blank)}}blank{{/if}}"#,
                &json!({"title": "Model", "blank": "  "}),
            )
            .expect("This to render");
        assert_eq!(res, "label=\"Model\";");
    }

    #[test]
    fn dot_handlebars_escapes_quotes_and_newlines() {
        let handlebars = get_dot_handlebars();
        let res = handlebars
            .render_template(
                r#""{{label}}""#,
                &json!({"label": "say \"hi\"\nConv2D \\ x"}),
            )
            .expect("This to render");
        assert_eq!(res, r#""say \"hi\"\nConv2D \\ x""#);
    }

    fn nested_clusters() -> Value {
        json!({"clusters": [
            {
                "id": "encoder",
                "key": "c0",
                "label": "encoder",
                "nodes": [{"id": "encoder/dense", "key": "n1"}],
                "clusters": [
                    {
                        "id": "encoder/block",
                        "key": "c1",
                        "label": "block \"a\"",
                        "nodes": [{"id": "encoder/block/conv", "key": "n2"}],
                        "clusters": []
                    }
                ]
            }
        ]})
    }

    #[test]
    fn handlebars_helper_dot_clusters_can_render() {
        let handlebars = get_dot_handlebars();
        let res = handlebars
            .render_template("{{{dot_clusters clusters}}}", &nested_clusters())
            .expect("This to render");
        assert_eq!(
            res,
            r##"  subgraph "cluster_encoder" {
    style="dashed"; label="encoder"; labeljust="l";
    "encoder/dense";
    subgraph "cluster_encoder/block" {
      style="dashed"; label="block \"a\""; labeljust="l";
      "encoder/block/conv";
    }
  }"##
        );
    }

    #[test]
    fn handlebars_helper_mermaid_clusters_can_render() {
        let handlebars = get_mermaid_handlebars();
        let res = handlebars
            .render_template("{{{mermaid_clusters clusters}}}", &nested_clusters())
            .expect("This to render");
        assert_eq!(
            res,
            "  subgraph c0[\"encoder\"]\n    n1\n    subgraph c1[\"block #quot;a#quot;\"]\n      n2\n    end\n  end"
        );
    }

    #[test]
    fn cluster_helpers_ignore_non_lists() {
        let handlebars = get_handlebars();
        let res = handlebars
            .render_template(
                "[{{{dot_clusters clusters}}}{{{mermaid_clusters clusters}}}]",
                &json!({"clusters": null}),
            )
            .expect("This to render");
        assert_eq!(res, "[]");
    }

    #[test]
    fn mermaid_escape_replaces_quotes() {
        assert_eq!(mermaid_escape("a \"b\"\nc"), "a #quot;b#quot;<br/>c");
    }

    #[test]
    fn write_string_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.dot");
        write_string_to_file(&path, "digraph {}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "digraph {}");
    }
}
