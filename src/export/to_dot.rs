use crate::config::RenderOptions;
use crate::errors::RenderBackendError;
use crate::graph::RenderedGraph;

pub fn render(graph: &RenderedGraph, options: &RenderOptions) -> Result<String, RenderBackendError> {
    let handlebars = crate::common::get_dot_handlebars();
    let context = super::renderer::create_standard_context(graph, options);
    let res = handlebars.render_template(&get_template(), &context)?;
    Ok(res)
}

pub fn get_template() -> String {
    include_str!("to_dot.hbs").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Orientation, RenderOptions};
    use crate::model::{LayerCategory, LayerInfo, ModelDescription};
    use crate::style::StyleRules;

    fn branching_graph() -> RenderedGraph {
        let model = ModelDescription::new("branch")
            .layer(LayerInfo::new("input_1", LayerCategory::Input))
            .layer(LayerInfo::new("conv_a", LayerCategory::Convolution).with_inputs(["input_1"]))
            .layer(LayerInfo::new("conv_b", LayerCategory::Convolution).with_inputs(["input_1"]))
            .layer(
                LayerInfo::new("concat", LayerCategory::Merge)
                    .with_class_name("Concatenate")
                    .with_inputs(["conv_a", "conv_b"]),
            );
        RenderedGraph::from_model(&model, StyleRules::builtin()).unwrap()
    }

    #[test]
    fn graphviz_template_can_render() {
        let res = render(&branching_graph(), &RenderOptions::default()).unwrap();

        assert!(res.starts_with("digraph \"branch\" {"));
        assert!(res.contains("rankdir=\"TB\";"));
        assert!(res.contains("concentrate=true;"));
        assert!(res.contains(
            "\"conv_a\" [label=\"conv_a\" shape=\"box\" style=\"filled,rounded\" fillcolor=\"#f7d7a8\""
        ));
        assert!(res.contains("\"input_1\" -> \"conv_a\";"));
        assert!(res.contains("\"conv_b\" -> \"concat\";"));
        assert!(res.contains("edge [ color=\"grey\" ];"));
        assert!(!res.contains("labelloc"));
        assert!(res.trim_end().ends_with('}'));
    }

    #[test]
    fn edge_count_matches_graph() {
        let graph = branching_graph();
        let res = render(&graph, &RenderOptions::default()).unwrap();
        assert_eq!(res.matches(" -> ").count(), graph.edge_count());
    }

    #[test]
    fn title_and_orientation_are_applied() {
        let options = RenderOptions::default()
            .with_title("Model \"v2\"")
            .with_orientation(Orientation::LR);
        let res = render(&branching_graph(), &options).unwrap();
        assert!(res.contains("rankdir=\"LR\";"));
        assert!(res.contains("label=\"Model \\\"v2\\\"\";"));
        assert!(res.contains("labelloc=\"t\";"));
    }

    #[test]
    fn class_names_render_on_second_line() {
        let mut graph = branching_graph();
        graph.apply_labels(true, false);
        let res = render(&graph, &RenderOptions::default()).unwrap();
        assert!(res.contains("[label=\"concat\\nConcatenate\""));
    }

    #[test]
    fn legend_uses_same_rank_rows_and_invisible_edges() {
        let legend = RenderedGraph::legend(StyleRules::builtin(), 4);
        let res = render(&legend, &RenderOptions::default()).unwrap();
        assert!(res.contains("{ rank=same; \"legend_input\";"));
        assert!(res.contains("[style=invis];"));
    }

    #[test]
    fn shapes_render_below_the_name() {
        let model = ModelDescription::new("shaped")
            .layer(LayerInfo::new("input_1", LayerCategory::Input).with_shapes(None, Some("(None, 8)")))
            .layer(
                LayerInfo::new("fc", LayerCategory::Dense)
                    .with_shapes(Some("(None, 8)"), Some("(None, 2)"))
                    .with_inputs(["input_1"]),
            );
        let mut graph = RenderedGraph::from_model(&model, StyleRules::builtin()).unwrap();
        graph.apply_labels(false, true);
        let res = render(&graph, &RenderOptions::default()).unwrap();
        assert!(res.contains("[label=\"input_1\\ninput: ?\\noutput: (None, 8)\""));
        assert!(res.contains("[label=\"fc\\ninput: (None, 8)\\noutput: (None, 2)\""));
    }

    #[test]
    fn wrapped_model_becomes_dashed_cluster() {
        let inner = ModelDescription::new("lstm_cell")
            .layer(LayerInfo::new("cell_in", LayerCategory::Input))
            .layer(LayerInfo::new("cell_out", LayerCategory::Recurrent).with_inputs(["cell_in"]));
        let model = ModelDescription::new("wrapped")
            .layer(LayerInfo::new("input_1", LayerCategory::Input))
            .layer(
                LayerInfo::new("bidi", LayerCategory::Recurrent)
                    .with_class_name("Bidirectional(LSTM)")
                    .with_submodel(inner)
                    .with_inputs(["input_1"]),
            )
            .layer(LayerInfo::new("fc", LayerCategory::Dense).with_inputs(["bidi"]));
        let graph = RenderedGraph::from_model_with(&model, StyleRules::builtin(), true).unwrap();
        let res = render(&graph, &RenderOptions::default()).unwrap();

        assert!(res.contains("  subgraph \"cluster_bidi\" {\n    style=\"dashed\"; label=\"lstm_cell\"; labeljust=\"l\";\n    \"bidi/cell_in\";\n    \"bidi/cell_out\";\n  }\n"));
        assert!(res.contains("\"input_1\" -> \"bidi\";"));
        assert!(res.contains("\"bidi\" -> \"bidi/cell_in\";"));
        assert!(res.contains("\"bidi/cell_out\" -> \"fc\";"));
        assert_eq!(res.matches(" -> ").count(), graph.edge_count());
    }
}
