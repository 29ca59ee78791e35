use clap::{ArgAction, Parser, Subcommand};
use composer_editor::{
    ComposerConfig, FlowComposer, FlowDocument, PageComposer, PageComposerConfig,
    parse_flow_declarations, parse_page_declarations,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "COMPOSER_LOG";

#[derive(Parser, Debug)]
#[command(name = "composer-cli")]
#[command(about = "In-process CLI host for the flow and page composers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Inspect(InspectArgs),
    Normalize(FlowFileArgs),
    Particles(FlowFileArgs),
    Instances(PageFileArgs),
}

#[derive(clap::Args, Debug)]
struct InspectArgs {
    #[arg(long)]
    flow_file: PathBuf,
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct FlowFileArgs {
    #[arg(long)]
    flow_file: PathBuf,
}

#[derive(clap::Args, Debug)]
struct PageFileArgs {
    #[arg(long)]
    page_file: PathBuf,
}

#[derive(Debug, Serialize)]
struct FlowSummary {
    flow_name: String,
    root_key: Option<String>,
    node_count: usize,
    particle_count: usize,
    selected: Vec<String>,
    fingerprint: String,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Inspect(args) => inspect_command(args),
        Commands::Normalize(args) => normalize_command(args),
        Commands::Particles(args) => particles_command(args),
        Commands::Instances(args) => instances_command(args),
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn inspect_command(args: InspectArgs) -> Result<ExitCode, String> {
    let (document, composer) = load_flow(&args.flow_file)?;
    let graph = composer.graph();
    let summary = FlowSummary {
        flow_name: document.flow_name,
        root_key: graph.root_key().map(ToOwned::to_owned),
        node_count: graph.len(),
        particle_count: composer.flow_particles().map_err(|e| e.to_string())?.len(),
        selected: composer
            .all_selected()
            .map_err(|e| e.to_string())?
            .into_iter()
            .map(|selected| selected.node_model.key)
            .collect(),
        fingerprint: composer.fingerprint().map_err(|e| e.to_string())?,
    };

    if args.json {
        let json = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
        println!("{json}");
    } else {
        println!("flow: {}", args.flow_file.display());
        println!("flow_name: {}", summary.flow_name);
        println!("root_key: {}", summary.root_key.as_deref().unwrap_or("<none>"));
        println!("nodes: {}", summary.node_count);
        println!("particles: {}", summary.particle_count);
        if summary.selected.is_empty() {
            println!("selected: <none>");
        } else {
            println!("selected: {}", summary.selected.join(", "));
        }
        println!("fingerprint: {}", summary.fingerprint);
    }
    Ok(ExitCode::SUCCESS)
}

fn normalize_command(args: FlowFileArgs) -> Result<ExitCode, String> {
    let (mut document, composer) = load_flow(&args.flow_file)?;
    let model = composer.serializable_flow_model().map_err(|e| e.to_string())?;
    document.model = model.to_value().map_err(|e| e.to_string())?;
    println!("{}", document.to_json().map_err(|e| e.to_string())?);
    Ok(ExitCode::SUCCESS)
}

fn particles_command(args: FlowFileArgs) -> Result<ExitCode, String> {
    let (_, composer) = load_flow(&args.flow_file)?;
    let particles = composer.flow_particles().map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(&particles).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}

fn instances_command(args: PageFileArgs) -> Result<ExitCode, String> {
    let source = read_source(&args.page_file)?;
    let document = parse_page_declarations(&source)
        .into_iter()
        .next()
        .ok_or_else(|| format!("'{}' is not a page document", args.page_file.display()))?;
    let composer = PageComposer::from_value(&document.components_tree, PageComposerConfig::default())
        .map_err(|e| e.to_string())?;
    let instances = composer.instances_list_unique().map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(&instances).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}

fn load_flow(path: &Path) -> Result<(FlowDocument, FlowComposer), String> {
    let source = read_source(path)?;
    let document = parse_flow_declarations(&source)
        .into_iter()
        .next()
        .ok_or_else(|| format!("'{}' is not a flow document", path.display()))?;
    tracing::debug!(flow = %document.flow_name, "loaded flow document");
    let composer = FlowComposer::from_value(&document.model, ComposerConfig::default())
        .map_err(|e| e.to_string())?;
    Ok((document, composer))
}

fn read_source(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("failed reading '{}': {e}", path.display()))
}
