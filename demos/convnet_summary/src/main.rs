use burn::backend::NdArray;
use burn::prelude::Tensor;
use clap::Parser;
use convnets::layers::layer_spec::LayerSpec;
use convnets::models::convnet::{ConvNet, ConvNetArchitecture, DEFAULT_NUM_CLASSES};
use std::io::IsTerminal;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Architecture name, e.g. ``resnet18`` or ``vgg16``.
    #[arg(default_value = "resnet18")]
    arch: ConvNetArchitecture,

    #[arg(long, default_value_t = DEFAULT_NUM_CLASSES)]
    num_classes: usize,

    #[arg(long, default_value = "224")]
    height: usize,

    #[arg(long, default_value = "224")]
    width: usize,

    /// Print the layer specs as JSON.
    #[arg(long)]
    json: bool,

    /// Initialize the model and run one forward pass on zeros.
    #[arg(long)]
    forward: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);
    Registry::default().with(filter).with(fmt_layer).init();
}

fn print_specs(specs: &[LayerSpec]) {
    for (idx, spec) in specs.iter().enumerate() {
        println!("{idx:>4}  {spec}");
    }
    let parametric = specs.iter().filter(|spec| spec.is_parametric()).count();
    println!("{} layers ({parametric} parametric)", specs.len());
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = args.arch.to_config(args.num_classes);
    config.try_validate()?;

    let specs = config.layer_specs();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&specs)?);
    } else {
        println!("# {}", args.arch);
        print_specs(&specs);
    }

    let input_resolution = [args.height, args.width];
    let Some(feature_resolution) = config.maybe_feature_resolution(input_resolution) else {
        anyhow::bail!(
            "{} cannot process a {}x{} input",
            args.arch,
            args.height,
            args.width
        );
    };
    tracing::info!(
        arch = %args.arch,
        ?input_resolution,
        ?feature_resolution,
        output_shape = ?config.output_shape(1, input_resolution),
        "predicted shapes"
    );

    if args.forward {
        type B = NdArray<f32>;
        let device = Default::default();

        let model: ConvNet<B> = config.init(&device);
        let input = Tensor::<B, 4>::zeros([1, 3, args.height, args.width], &device);
        let output = model.forward(input);

        tracing::info!(output_shape = ?output.dims(), "forward");
        println!("{}", output);
    }

    Ok(())
}
