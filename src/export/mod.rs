pub mod to_dot;
pub mod to_mermaid;

use std::fmt;
use std::path::Path;

use crate::errors::RenderBackendError;

/// Output file format, chosen from the output path's extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Dot,
    Mermaid,
    Png,
    Svg,
    Pdf,
    Jpeg,
    Gif,
    Ps,
    Eps,
}

impl OutputFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "dot" | "gv" => Some(Self::Dot),
            "mmd" | "mermaid" => Some(Self::Mermaid),
            "png" => Some(Self::Png),
            "svg" => Some(Self::Svg),
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "ps" => Some(Self::Ps),
            "eps" => Some(Self::Eps),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, RenderBackendError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::from_extension(&ext).ok_or(RenderBackendError::UnsupportedFormat(ext))
    }

    /// Text formats are written directly, without Graphviz
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Dot | Self::Mermaid)
    }

    /// Graphviz `-T` output name for image formats
    pub fn graphviz_name(&self) -> Option<&'static str> {
        match self {
            Self::Dot | Self::Mermaid => None,
            Self::Png => Some("png"),
            Self::Svg => Some("svg"),
            Self::Pdf => Some("pdf"),
            Self::Jpeg => Some("jpg"),
            Self::Gif => Some("gif"),
            Self::Ps => Some("ps"),
            Self::Eps => Some("eps"),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dot => f.write_str("dot"),
            Self::Mermaid => f.write_str("mermaid"),
            other => f.write_str(other.graphviz_name().unwrap_or("unknown")),
        }
    }
}

/// Builds the template context shared by the text exporters
pub mod renderer {
    use crate::config::RenderOptions;
    use crate::graph::{Cluster, DiagramEdge, DiagramNode, RenderedGraph};
    use indexmap::IndexMap;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    pub fn create_standard_context(graph: &RenderedGraph, options: &RenderOptions) -> Value {
        let keys: HashMap<&str, String> = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.as_str(), format!("n{}", index)))
            .collect();

        let nodes: Vec<Value> = graph
            .nodes
            .iter()
            .map(|node| node_value(node, &keys))
            .collect();
        let edges: Vec<Value> = graph
            .edges
            .iter()
            .map(|edge| edge_value(edge, &keys))
            .collect();

        json!({
            "graph_name": &graph.name,
            "config": options,
            "nodes": nodes,
            "edges": edges,
            "ranks": &graph.ranks,
            "edge_color": &graph.edge_color,
            "classes": class_values(graph),
            "clusters": cluster_values(&graph.clusters, &keys, &mut 0),
        })
    }

    fn node_value(node: &DiagramNode, keys: &HashMap<&str, String>) -> Value {
        let mut value = serde_json::to_value(node).unwrap_or(Value::Null);
        if let Some(map) = value.as_object_mut() {
            map.insert("key".to_string(), Value::from(key_of(keys, &node.id)));
            map.insert("dot_style".to_string(), Value::from(node.style.dot_style()));
            map.insert(
                "border_color".to_string(),
                Value::from(node.style.border_color()),
            );
        }
        value
    }

    fn edge_value(edge: &DiagramEdge, keys: &HashMap<&str, String>) -> Value {
        let mut value = serde_json::to_value(edge).unwrap_or(Value::Null);
        if let Some(map) = value.as_object_mut() {
            map.insert(
                "source_key".to_string(),
                Value::from(key_of(keys, &edge.source)),
            );
            map.insert(
                "target_key".to_string(),
                Value::from(key_of(keys, &edge.target)),
            );
        }
        value
    }

    fn key_of(keys: &HashMap<&str, String>, id: &str) -> String {
        keys.get(id).cloned().unwrap_or_else(|| id.to_string())
    }

    /// One class per style class present in the graph
    fn class_values(graph: &RenderedGraph) -> Vec<Value> {
        let mut classes: IndexMap<&str, &DiagramNode> = IndexMap::new();
        for node in &graph.nodes {
            classes.entry(node.style_class.as_str()).or_insert(node);
        }
        classes
            .into_iter()
            .map(|(name, node)| {
                json!({
                    "name": name,
                    "fill": node.style.fill_color,
                    "stroke": node.style.border_color(),
                    "color": node.style.font_color,
                })
            })
            .collect()
    }

    /// Clusters get keys `c0`, `c1`, ... in depth-first order
    fn cluster_values(
        clusters: &[Cluster],
        keys: &HashMap<&str, String>,
        next_key: &mut usize,
    ) -> Vec<Value> {
        clusters
            .iter()
            .map(|cluster| {
                let key = format!("c{}", next_key);
                *next_key += 1;
                let nodes: Vec<Value> = cluster
                    .nodes
                    .iter()
                    .map(|id| json!({"id": id, "key": key_of(keys, id)}))
                    .collect();
                json!({
                    "id": &cluster.id,
                    "key": key,
                    "label": &cluster.label,
                    "nodes": nodes,
                    "clusters": cluster_values(&cluster.clusters, keys, next_key),
                })
            })
            .collect()
    }
}
