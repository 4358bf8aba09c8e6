use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod filter;
mod input;
mod manifest;
mod output;
mod pipeline;
mod render;
mod scan;
mod store;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "kubectl-slice", version)]
#[command(
    about = "Split a multi-document Kubernetes YAML into one file per resource",
    long_about = None,
    after_help = "Examples:\n  kubectl-slice -f foo.yaml -o ./ --include-kind Pod,Namespace\n  kubectl-slice -f foo.yaml --exclude-name '*-svc' --stdout\n  kubectl-slice --config config.yaml"
)]
struct Cli {
    /// Path to a YAML config file; keys are flag names with "_" for "-"
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    args: config::SliceArgs,
}

fn init_tracing(debug: bool) {
    let default = if debug {
        "kubectl_slice=debug"
    } else {
        "kubectl_slice=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Layer flags and environment over the config file.
    let args = match cli.config {
        Some(path) => cli.args.or(config::load_config_file(&path)?),
        None => cli.args,
    };

    // 2) Validate everything before reading input.
    let opts = config::Options::resolve(args).context("validation failed")?;
    init_tracing(opts.debug);
    let slicer = pipeline::Slicer::new(&opts.filters, &opts.template, opts.sort_by_kind)
        .context("validation failed")?;
    tracing::debug!(?opts, "resolved options");

    // 3) Slice.
    let reader = opts.input.open(opts.quiet)?;
    let docs = slicer.slice(reader)?;

    // 4) Store.
    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    let (mut out, mut err) = (stdout.lock(), stderr.lock());
    store::Store::new(&opts.store, &mut out, &mut err).write_all(&docs)?;
    Ok(())
}
