use anyhow::Result;
use netvis::{LayerCategory, LayerInfo, ModelDescription, RenderOptions, Renderer};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("handlebars=off,{}", log_level)))
        .without_time()
        .init();
}

fn inception_block() -> ModelDescription {
    ModelDescription::new("inception_block")
        .layer(LayerInfo::new("input_1", LayerCategory::Input).with_class_name("InputLayer"))
        .layer(
            LayerInfo::new("conv_1x1", LayerCategory::Convolution)
                .with_class_name("Conv2D")
                .with_inputs(["input_1"]),
        )
        .layer(
            LayerInfo::new("conv_3x3_reduce", LayerCategory::Convolution)
                .with_class_name("Conv2D")
                .with_inputs(["input_1"]),
        )
        .layer(
            LayerInfo::new("conv_3x3", LayerCategory::Convolution)
                .with_class_name("Conv2D")
                .with_inputs(["conv_3x3_reduce"]),
        )
        .layer(
            LayerInfo::new("pool", LayerCategory::Pooling)
                .with_class_name("MaxPooling2D")
                .with_inputs(["input_1"]),
        )
        .layer(
            LayerInfo::new("pool_proj", LayerCategory::Convolution)
                .with_class_name("Conv2D")
                .with_inputs(["pool"]),
        )
        .layer(
            LayerInfo::new("concat", LayerCategory::Merge)
                .with_class_name("Concatenate")
                .with_inputs(["conv_1x1", "conv_3x3", "pool_proj"]),
        )
        .layer(
            LayerInfo::new("flatten", LayerCategory::Reshape)
                .with_class_name("Flatten")
                .with_inputs(["concat"]),
        )
        .layer(
            LayerInfo::new("predictions", LayerCategory::Dense)
                .with_class_name("Dense")
                .with_inputs(["flatten"]),
        )
}

fn main() -> Result<()> {
    setup_logging(&std::env::var("NETVIS_LOG").ok());

    let out_dir = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| "out".to_string()));
    let renderer = Renderer::new().with_options(RenderOptions {
        show_class_names: true,
        ..RenderOptions::default().with_title("Inception block")
    });

    let model = inception_block();
    let dot = renderer.render(&model, out_dir.join("inception_block.dot"))?;
    let mermaid = renderer.render(&model, out_dir.join("inception_block.mmd"))?;
    let legend = renderer.render_legend(out_dir.join("legend.dot"), 4)?;

    for output in [dot, mermaid, legend] {
        info!("{} ({} nodes)", output.path.display(), output.node_count);
    }
    Ok(())
}
