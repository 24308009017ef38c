//! Chartwright CLI - render Jinja2 charts into ordered Kubernetes manifests

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use chartwright_core::{DEFAULT_NAMESPACE, DEFAULT_RELEASE_NAME};

mod commands;
mod display;
mod error;
mod exit_codes;

use commands::template::TemplateOptions;

#[derive(Parser)]
#[command(name = "chartwright")]
#[command(version)]
#[command(about = "Render Jinja2 charts into ordered Kubernetes manifests", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render chart templates locally
    ///
    /// Values are merged from the chart's values.yaml, then every -f file in
    /// order, then --set. Generic manifests are printed in install order;
    /// nothing is printed if any step fails.
    Template {
        /// Chart directory
        chart: PathBuf,

        /// Release name (for template context)
        #[arg(long, default_value = DEFAULT_RELEASE_NAME)]
        name: String,

        /// Target namespace
        #[arg(short, long, env = "CHARTWRIGHT_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
        namespace: String,

        /// Values file(s) to merge; repeatable or comma-separated
        #[arg(short = 'f', long = "values", value_delimiter = ',')]
        values: Vec<PathBuf>,

        /// Set values on the command line (key1=val1,key2=val2)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Extra API versions to accept, e.g. monitoring.coreos.com/v1
        #[arg(short = 'a', long = "api-versions", value_delimiter = ',')]
        api_versions: Vec<String>,

        /// Kubernetes version reported to templates
        #[arg(long)]
        kube_version: Option<String>,

        /// Write manifests under this directory instead of stdout
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Only output documents whose name contains this string
        #[arg(short = 's', long)]
        show_only: Option<String>,

        /// Show the rendered NOTES.txt as well
        #[arg(long)]
        notes: bool,

        /// Show hook manifests after the generic ones
        #[arg(long)]
        hooks: bool,

        /// Show the merged values as well
        #[arg(short, long)]
        verbose: bool,
    },
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_logging(cli.debug);

    let result = match cli.command {
        Commands::Template {
            chart,
            name,
            namespace,
            values,
            set,
            api_versions,
            kube_version,
            output_dir,
            show_only,
            notes,
            hooks,
            verbose,
        } => commands::template::run(&TemplateOptions {
            chart,
            name,
            namespace,
            values_files: values,
            set,
            api_versions,
            kube_version,
            output_dir,
            show_only,
            notes,
            hooks,
            verbose,
        }),
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
