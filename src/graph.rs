use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

use crate::errors::{RenderBackendError, UnsupportedModelError};
use crate::keras::category_for_class;
use crate::model::{LayerCategory, LayerInfo, ModelIntrospection};
use crate::style::{NodeStyle, StyleRules};

/// A styled, directed graph ready to hand to a rendering backend
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RenderedGraph {
    pub name: String,
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
    /// Groups of node ids placed on the same rank
    #[serde(default)]
    pub ranks: Vec<Vec<String>>,
    /// Expanded nested models, outermost first
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    pub edge_color: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DiagramNode {
    /// The layer name, prefixed by its enclosing models when expanded
    pub id: String,
    pub name: String,
    pub label: String,
    pub category: LayerCategory,
    pub class_name: Option<String>,
    pub input_shape: Option<String>,
    pub output_shape: Option<String>,
    pub style: NodeStyle,
    /// Name shared by nodes drawn with the same rule
    pub style_class: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DiagramEdge {
    /// Producing layer
    pub source: String,
    /// Consuming layer
    pub target: String,
    pub visible: bool,
}

impl DiagramEdge {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            visible: true,
        }
    }
}

/// A nested model drawn as a box around its layers
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Cluster {
    pub id: String,
    pub label: String,
    /// Nodes directly inside this cluster
    pub nodes: Vec<String>,
    pub clusters: Vec<Cluster>,
}

/// Where edges attach to a layer from outside: `entry` receives its inputs,
/// `exit` feeds its consumers. Both are the layer's own node unless the
/// layer was expanded into a cluster.
struct Ports {
    entry: String,
    exit: String,
}

struct GraphBuilder<'a> {
    styles: &'a StyleRules,
    expand_nested: bool,
    nodes: Vec<DiagramNode>,
    edges: Vec<DiagramEdge>,
    seen_edges: HashSet<(String, String)>,
}

/// What one model level contributed to the graph
struct Level {
    nodes: Vec<String>,
    clusters: Vec<Cluster>,
    first: String,
    last: String,
}

impl<'a> GraphBuilder<'a> {
    fn add_edge(&mut self, source: &str, target: &str) {
        if self.seen_edges.insert((source.to_string(), target.to_string())) {
            self.edges.push(DiagramEdge::new(source, target));
        }
    }

    fn add_node(&mut self, id: String, layer: &LayerInfo) {
        let class_name = layer.class_name.as_deref();
        let style_class = match class_name {
            Some(name) if self.styles.class_rule(name).is_some() => style_class_name(name),
            _ => layer.category.as_str().to_string(),
        };
        self.nodes.push(DiagramNode {
            id,
            name: layer.name.clone(),
            label: layer.name.clone(),
            category: layer.category,
            class_name: layer.class_name.clone(),
            input_shape: layer.input_shape.clone(),
            output_shape: layer.output_shape.clone(),
            style: self.styles.resolve_layer(&layer.category, class_name).clone(),
            style_class,
        });
    }

    fn add_level(&mut self, prefix: &str, layers: &[LayerInfo]) -> Result<Level, UnsupportedModelError> {
        validate_layers(layers)?;

        let mut level = Level {
            nodes: Vec::new(),
            clusters: Vec::new(),
            first: String::new(),
            last: String::new(),
        };
        let mut ports: HashMap<&str, Ports> = HashMap::with_capacity(layers.len());

        for layer in layers {
            let id = format!("{}{}", prefix, layer.name);
            let submodel = layer
                .submodel
                .as_deref()
                .filter(|_| self.expand_nested && layer.has_submodel());

            let port = match submodel {
                Some(submodel) => {
                    let is_wrapper = layer.category != LayerCategory::Model;
                    if is_wrapper {
                        self.add_node(id.clone(), layer);
                        level.nodes.push(id.clone());
                    }
                    let inner = self.add_level(&format!("{}/", id), &submodel.layers)?;
                    if is_wrapper {
                        self.add_edge(&id, &inner.first);
                    }
                    level.clusters.push(Cluster {
                        id: id.clone(),
                        label: submodel.name.clone().unwrap_or_else(|| layer.name.clone()),
                        nodes: inner.nodes,
                        clusters: inner.clusters,
                    });
                    Ports {
                        entry: if is_wrapper { id } else { inner.first },
                        exit: inner.last,
                    }
                }
                None => {
                    self.add_node(id.clone(), layer);
                    level.nodes.push(id.clone());
                    Ports {
                        entry: id.clone(),
                        exit: id,
                    }
                }
            };
            ports.insert(layer.name.as_str(), port);
        }

        for layer in layers {
            let mut seen: HashSet<&str> = HashSet::new();
            for input in &layer.inputs {
                let (Some(source), Some(target)) = (ports.get(input.as_str()), ports.get(layer.name.as_str()))
                else {
                    return Err(UnsupportedModelError::UnknownInput {
                        layer: layer.name.clone(),
                        input: input.clone(),
                    });
                };
                if !seen.insert(input.as_str()) {
                    debug!(
                        "Layer '{}' lists input '{}' more than once, drawing one edge",
                        layer.name, input
                    );
                    continue;
                }
                let (source, target) = (source.exit.clone(), target.entry.clone());
                self.add_edge(&source, &target);
            }
        }

        if let (Some(first), Some(last)) = (layers.first(), layers.last()) {
            level.first = ports.get(first.name.as_str()).map(|p| p.entry.clone()).unwrap_or_default();
            level.last = ports.get(last.name.as_str()).map(|p| p.exit.clone()).unwrap_or_default();
        }
        Ok(level)
    }
}

fn validate_layers(layers: &[LayerInfo]) -> Result<(), UnsupportedModelError> {
    if layers.is_empty() {
        return Err(UnsupportedModelError::EmptyModel);
    }

    let mut names: HashSet<&str> = HashSet::with_capacity(layers.len());
    for (position, layer) in layers.iter().enumerate() {
        if layer.name.trim().is_empty() {
            return Err(UnsupportedModelError::UnnamedLayer(position));
        }
        if !names.insert(layer.name.as_str()) {
            return Err(UnsupportedModelError::DuplicateLayer(layer.name.clone()));
        }
    }
    Ok(())
}

/// Class names become `cls_<lowercase alphanumerics>` so they never clash
/// with category names
fn style_class_name(class_name: &str) -> String {
    let cleaned: String = class_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    format!("cls_{}", cleaned)
}

impl RenderedGraph {
    /// Builds the diagram graph of a model: one node per layer, one edge per
    /// connection from input layer to consuming layer.
    pub fn from_model<M: ModelIntrospection + ?Sized>(
        model: &M,
        styles: &StyleRules,
    ) -> Result<Self, UnsupportedModelError> {
        Self::from_model_with(model, styles, false)
    }

    /// Like [`RenderedGraph::from_model`], but with `expand_nested` every
    /// layer carrying a submodel is drawn as a cluster of the submodel's
    /// layers. A nested model is replaced by its cluster; a wrapper keeps its
    /// own node, which feeds the cluster's first layer. Consumers are fed by
    /// the cluster's last layer.
    pub fn from_model_with<M: ModelIntrospection + ?Sized>(
        model: &M,
        styles: &StyleRules,
        expand_nested: bool,
    ) -> Result<Self, UnsupportedModelError> {
        let layers = model.layers()?;

        let mut builder = GraphBuilder {
            styles,
            expand_nested,
            nodes: Vec::with_capacity(layers.len()),
            edges: Vec::new(),
            seen_edges: HashSet::new(),
        };
        let level = builder.add_level("", &layers)?;

        Ok(Self {
            name: model.model_name().unwrap_or_else(|| "model".to_string()),
            nodes: builder.nodes,
            edges: builder.edges,
            ranks: Vec::new(),
            clusters: level.clusters,
            edge_color: styles.edge_color.clone(),
        })
    }

    /// A legend: one node per category rule, then one per class rule,
    /// `columns` nodes per row
    pub fn legend(styles: &StyleRules, columns: usize) -> Self {
        let columns = columns.max(1);
        let swatch = |id: String, label: &str, category: LayerCategory, style: &NodeStyle, style_class: String| {
            DiagramNode {
                id,
                name: label.to_string(),
                label: label.to_string(),
                category,
                class_name: None,
                input_shape: None,
                output_shape: None,
                style: style.clone().with_font_color("white"),
                style_class,
            }
        };

        let mut nodes: Vec<DiagramNode> = styles
            .rules
            .iter()
            .map(|(category, style)| {
                swatch(
                    format!("legend_{}", category),
                    category.as_str(),
                    *category,
                    style,
                    category.as_str().to_string(),
                )
            })
            .collect();
        nodes.extend(styles.classes.iter().map(|(class_name, style)| {
            swatch(
                format!("legend_class_{}", class_name),
                class_name,
                category_for_class(class_name),
                style,
                style_class_name(class_name),
            )
        }));

        let ranks: Vec<Vec<String>> = nodes
            .chunks(columns)
            .map(|row| row.iter().map(|n| n.id.clone()).collect())
            .collect();

        // invisible edges stack the rows
        let edges = ranks
            .windows(2)
            .map(|pair| DiagramEdge {
                visible: false,
                ..DiagramEdge::new(&pair[0][0], &pair[1][0])
            })
            .collect();

        Self {
            name: "legend".to_string(),
            nodes,
            edges,
            ranks,
            clusters: Vec::new(),
            edge_color: styles.edge_color.clone(),
        }
    }

    /// Sets node labels to the layer name, optionally followed by the class
    /// name and the input and output shapes on their own lines
    pub fn apply_labels(&mut self, show_class_names: bool, show_shapes: bool) {
        for node in &mut self.nodes {
            let mut label = node.name.clone();
            if let (Some(class_name), true) = (&node.class_name, show_class_names) {
                label.push('\n');
                label.push_str(class_name);
            }
            if show_shapes && (node.input_shape.is_some() || node.output_shape.is_some()) {
                let unknown = "?".to_string();
                label.push_str(&format!(
                    "\ninput: {}\noutput: {}",
                    node.input_shape.as_ref().unwrap_or(&unknown),
                    node.output_shape.as_ref().unwrap_or(&unknown)
                ));
            }
            node.label = label;
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of visible edges
    pub fn edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.visible).count()
    }

    pub fn get_node_by_id(&self, id: &str) -> Option<&DiagramNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn incoming_edges(&self, id: &str) -> Vec<&DiagramEdge> {
        self.edges.iter().filter(|e| e.target == id).collect()
    }

    pub fn outgoing_edges(&self, id: &str) -> Vec<&DiagramEdge> {
        self.edges.iter().filter(|e| e.source == id).collect()
    }

    /// Nodes with no incoming edges
    pub fn sources(&self) -> Vec<&DiagramNode> {
        let targets: HashSet<&str> = self.edges.iter().map(|e| e.target.as_str()).collect();
        self.nodes
            .iter()
            .filter(|n| !targets.contains(n.id.as_str()))
            .collect()
    }

    /// Node ids grouped by category, in first-seen order
    pub fn nodes_by_category(&self) -> IndexMap<LayerCategory, Vec<&str>> {
        let mut groups: IndexMap<LayerCategory, Vec<&str>> = IndexMap::new();
        for node in &self.nodes {
            groups.entry(node.category).or_default().push(node.id.as_str());
        }
        groups
    }

    /// Node ids in topological order, ties broken by model order.
    ///
    /// Fails with [`RenderBackendError::CyclicGraph`] naming the nodes that
    /// could not be ordered.
    pub fn topological_order(&self) -> Result<Vec<&str>, RenderBackendError> {
        let mut in_degree: HashMap<&str, usize> =
            self.nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
        let mut adj_list: HashMap<&str, Vec<&str>> = HashMap::new();

        for edge in &self.edges {
            adj_list
                .entry(edge.source.as_str())
                .or_default()
                .push(edge.target.as_str());
            if let Some(degree) = in_degree.get_mut(edge.target.as_str()) {
                *degree += 1;
            }
        }

        let mut queue: VecDeque<&str> = self
            .nodes
            .iter()
            .map(|n| n.id.as_str())
            .filter(|id| in_degree.get(id) == Some(&0))
            .collect();

        let mut sorted = Vec::with_capacity(self.nodes.len());

        while let Some(node_id) = queue.pop_front() {
            sorted.push(node_id);

            if let Some(neighbors) = adj_list.get(node_id) {
                for neighbor in neighbors {
                    if let Some(degree) = in_degree.get_mut(neighbor) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(*neighbor);
                        }
                    }
                }
            }
        }

        if sorted.len() != self.nodes.len() {
            let ordered: HashSet<&str> = sorted.iter().copied().collect();
            let remaining = self
                .nodes
                .iter()
                .map(|n| n.id.clone())
                .filter(|id| !ordered.contains(id.as_str()))
                .collect();
            return Err(RenderBackendError::CyclicGraph(remaining));
        }

        Ok(sorted)
    }
}
