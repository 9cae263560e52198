use std::fs;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::info;
use tracing_subscriber::EnvFilter;

use geo_convert::config::{ConfigLoader, ResolvedConfig};
use geo_convert::context::ConversionContext;
use geo_convert::converter::GeoConverter;
use geo_convert::error::ConvertError;
use geo_convert::fs_util::{read_records, write_json_atomic};
use geo_convert::output::{ConversionSummary, JsonOutput};
use geo_convert::store::{Collaborators, MemoryStore, TaxonSeed};

#[derive(Parser)]
#[command(name = "geo-convert")]
#[command(about = "Convert parsed GEO platforms, series and datasets into expression-warehouse entities")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Convert a JSON (optionally gzip) file of GEO records")]
    Convert(ConvertArgs),
    #[command(about = "Print the resolved converter settings")]
    Config(ConfigArgs),
}

#[derive(Args)]
struct ConvertArgs {
    input: Utf8PathBuf,

    #[arg(long)]
    config: Option<String>,

    /// Probe count above which strict element selection applies.
    #[arg(long)]
    max_elements: Option<usize>,

    #[arg(long)]
    split_by_platform: bool,

    #[arg(long)]
    force_convert_elements: bool,

    /// JSON file with a list of known taxa to seed the taxon store.
    #[arg(long)]
    taxa: Option<Utf8PathBuf>,

    /// Where to write the full converted entity graph.
    #[arg(long)]
    output: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long)]
    config: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<ConvertError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ConvertError) -> u8 {
    match error {
        ConvertError::ConfigRead(_)
        | ConvertError::ConfigParse(_)
        | ConvertError::InvalidConfig(_)
        | ConvertError::InputParse(_)
        | ConvertError::Filesystem(_) => 2,
        ConvertError::Store(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Convert(args) => run_convert(args),
        Commands::Config(args) => {
            let resolved = ConfigLoader::resolve(args.config.as_deref())?;
            JsonOutput::print_config(&resolved).into_diagnostic()?;
            Ok(())
        }
    }
}

fn run_convert(args: ConvertArgs) -> miette::Result<()> {
    let mut resolved = ConfigLoader::resolve(args.config.as_deref())?;
    apply_overrides(&mut resolved, &args)?;

    let seeds = match &args.taxa {
        Some(path) => load_taxa(path)?,
        None => Vec::new(),
    };
    let store = MemoryStore::new()
        .with_taxa(seeds)?
        .with_blacklist(resolved.blacklist.iter().cloned());

    let records = read_records(&args.input)?;
    info!(input = %args.input, records = records.len(), "read GEO records");

    let converter = GeoConverter::new(&resolved.settings, Collaborators::from_store(&store));
    let mut context = ConversionContext::new();
    let results = converter.convert(&records, &mut context)?;

    if let Some(output) = &args.output {
        write_json_atomic(output, &results)?;
        info!(output = %output, "wrote converted entities");
    }
    let summary = ConversionSummary::new(
        args.input.as_str(),
        args.output.as_ref().map(|path| path.to_string()),
        &results,
    );
    JsonOutput::print_summary(&summary).into_diagnostic()?;
    Ok(())
}

fn apply_overrides(resolved: &mut ResolvedConfig, args: &ConvertArgs) -> Result<(), ConvertError> {
    if let Some(max_elements) = args.max_elements {
        if max_elements == 0 {
            return Err(ConvertError::InvalidConfig(
                "--max-elements must be greater than zero".to_string(),
            ));
        }
        resolved.settings.too_many_elements = max_elements;
    }
    if args.split_by_platform {
        resolved.settings.split_by_platform = true;
    }
    if args.force_convert_elements {
        resolved.settings.force_convert_elements = true;
    }
    Ok(())
}

fn load_taxa(path: &Utf8PathBuf) -> Result<Vec<TaxonSeed>, ConvertError> {
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|err| ConvertError::Filesystem(format!("read {path}: {err}")))?;
    serde_json::from_str(&content).map_err(|err| ConvertError::InputParse(format!("{path}: {err}")))
}
