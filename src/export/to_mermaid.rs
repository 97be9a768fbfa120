use crate::config::RenderOptions;
use crate::errors::RenderBackendError;
use crate::graph::RenderedGraph;

pub fn render(graph: &RenderedGraph, options: &RenderOptions) -> Result<String, RenderBackendError> {
    let handlebars = crate::common::get_mermaid_handlebars();
    let context = super::renderer::create_standard_context(graph, options);
    let res = handlebars.render_template(&get_template(), &context)?;
    Ok(res)
}

pub fn get_template() -> String {
    let template = r##"{{#if (exists config.title)}}---
title: "{{config.title}}"
---
{{/if}}flowchart {{config.orientation}}
{{#each nodes as |node|}}
{{#if node.style.rounded}}
  {{node.key}}("{{node.label}}"):::{{node.style_class}}
{{else}}
  {{node.key}}["{{node.label}}"]:::{{node.style_class}}
{{/if}}
{{/each}}
{{#if clusters}}
{{{mermaid_clusters clusters}}}
{{/if}}
{{#each edges as |edge|}}
{{#if edge.visible}}
  {{edge.source_key}} --> {{edge.target_key}}
{{else}}
  {{edge.source_key}} ~~~ {{edge.target_key}}
{{/if}}
{{/each}}
{{#each classes as |class|}}
  classDef {{class.name}} fill:{{class.fill}},stroke:{{class.stroke}},color:{{class.color}}
{{/each}}
  linkStyle default stroke:{{edge_color}}
"##;

    template.to_string()
}
