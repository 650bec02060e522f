//! CLI entry point for the occupation semantic search engine.
//!
//! Provides commands for initializing configuration, building the vector
//! index from the occupation catalog, and running semantic queries.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use ncofind::io::{ExitCode, JsonErrorResponse, OutputFormat};
use ncofind::vector::FastEmbedGenerator;
use ncofind::{
    EngineError, HierarchyResolver, IndexStore, IndexingPipeline, SearchService, Settings,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Semantic search over the NCO-2015 occupation catalog
#[derive(Parser)]
#[command(
    name = "ncofind",
    version = env!("CARGO_PKG_VERSION"),
    about = "Semantic search over the NCO-2015 occupation catalog",
    long_about = "Index occupation titles as embeddings and resolve free-text \
                  job descriptions to classification codes with full hierarchy.",
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Initialize project
    #[command(about = "Set up .ncofind directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Build the vector index from the occupation catalog
    #[command(about = "Encode the occupation catalog and build the vector index")]
    Index {
        /// Catalog CSV (defaults to the configured dataset path)
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// Index name (defaults to the configured name)
        #[arg(short, long)]
        name: Option<String>,

        /// Show model download progress
        #[arg(long)]
        progress: bool,
    },

    /// Search the index with a free-text query
    #[command(about = "Resolve a job description to ranked occupation codes")]
    Search {
        /// Free-text job description
        query: String,

        /// Number of results to return
        #[arg(short)]
        k: Option<usize>,

        /// Output as JSON for tool integration
        #[arg(long)]
        json: bool,
    },

    /// Display active settings
    #[command(about = "Display active settings from .ncofind/settings.toml")]
    Config,
}

fn main() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            let err = EngineError::Config {
                reason: e.to_string(),
            };
            let code = report(Err(err), false);
            std::process::exit(code.into());
        }
    };
    if let Err(reason) = settings.check() {
        let code = report(Err(EngineError::Config { reason }), false);
        std::process::exit(code.into());
    }
    ncofind::config::set_global_debug(settings.debug);
    ncofind::debug_print!(
        "Settings loaded: index_path={}, model={}",
        settings.index_path.display(),
        settings.search.model
    );

    let exit_code = match cli.command {
        Commands::Init { force } => run_init(force),
        Commands::Index {
            dataset,
            name,
            progress,
        } => report(run_index(&settings, dataset, name, progress), false),
        Commands::Search { query, k, json } => {
            let format = OutputFormat::from_json_flag(json);
            report(run_search(&settings, &query, k, format), json)
        }
        Commands::Config => run_config(&settings),
    };

    std::process::exit(exit_code.into());
}

/// Prints the error (text or JSON envelope) and maps it to an exit code.
fn report(result: Result<(), EngineError>, json: bool) -> ExitCode {
    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            if json {
                let envelope = JsonErrorResponse::from_error(&e);
                match serde_json::to_string_pretty(&envelope) {
                    Ok(out) => println!("{out}"),
                    Err(_) => eprintln!("Error: {e}"),
                }
            } else {
                eprintln!("Error: {e}");
                for suggestion in e.recovery_suggestions() {
                    eprintln!("  Suggestion: {suggestion}");
                }
            }
            ExitCode::from_error(&e)
        }
    }
}

fn run_init(force: bool) -> ExitCode {
    match Settings::init_config_file(force) {
        Ok(_) => ExitCode::Success,
        Err(e) => {
            eprintln!("Failed to initialize configuration: {e}");
            ExitCode::ConfigError
        }
    }
}

fn run_index(
    settings: &Settings,
    dataset: Option<PathBuf>,
    name: Option<String>,
    progress: bool,
) -> Result<(), EngineError> {
    let dataset = dataset.unwrap_or_else(|| settings.dataset.occupations.clone());
    let name = name.unwrap_or_else(|| settings.indexing.index_name.clone());

    let embedder = FastEmbedGenerator::with_progress(
        &settings.search.model,
        &models_dir(settings),
        progress,
    )
    .map_err(|e| EngineError::Embedding(e.to_string()))?;

    let store = IndexStore::new(&settings.index_path, &name);
    let pipeline = IndexingPipeline::new(Arc::new(embedder), settings.indexing.batch_size);
    let report = pipeline.reindex(&store, &dataset)?;

    println!(
        "Indexed {} occupations into '{}' ({} batches, {:.1}s)",
        report.indexed, name, report.batches, report.elapsed_secs
    );
    if report.skipped > 0 {
        println!("Skipped {} malformed rows", report.skipped);
    }
    if report.deduplicated > 0 {
        println!("Dropped {} duplicate codes (kept last occurrence)", report.deduplicated);
    }

    Ok(())
}

fn run_search(
    settings: &Settings,
    query: &str,
    k: Option<usize>,
    format: OutputFormat,
) -> Result<(), EngineError> {
    let k = k.unwrap_or(settings.search.k);

    let embedder = FastEmbedGenerator::new(&settings.search.model, &models_dir(settings))
        .map_err(|e| EngineError::Embedding(e.to_string()))?;

    let store = IndexStore::new(&settings.index_path, &settings.indexing.index_name);
    let resolver = HierarchyResolver::load(&settings.dataset)?;

    let service = SearchService::new(
        Arc::new(embedder),
        Arc::new(store),
        Arc::new(resolver),
        settings.search.num_candidates,
    );

    let response = service.search(query, k)?;

    if format.is_json() {
        let out = serde_json::to_string_pretty(&response)
            .map_err(|e| EngineError::General(format!("Failed to serialize response: {e}")))?;
        println!("{out}");
    } else {
        println!("Query: {}", response.query);
        println!("Embedding time: {:.3}s", response.embedding_time);
        if response.results.is_empty() {
            println!("No matches found.");
        }
        for (rank, result) in response.results.iter().enumerate() {
            println!(
                "{}. {} [NCO2015: {}{}] (confidence: {:.4})",
                rank + 1,
                result.title,
                result.code2015,
                if result.code2004.is_empty() {
                    String::new()
                } else {
                    format!(", NCO2004: {}", result.code2004)
                },
                result.confidence
            );
            println!(
                "   {} > {} > {} > {}",
                result.hierarchy.division,
                result.hierarchy.subdivision,
                result.hierarchy.group,
                result.hierarchy.family
            );
        }
    }

    Ok(())
}

fn run_config(settings: &Settings) -> ExitCode {
    match toml::to_string_pretty(settings) {
        Ok(out) => {
            println!("{out}");
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Failed to render configuration: {e}");
            ExitCode::GeneralError
        }
    }
}

/// Embedding model cache directory, next to the index directory.
fn models_dir(settings: &Settings) -> PathBuf {
    settings
        .index_path
        .parent()
        .map(|p| p.join("models"))
        .unwrap_or_else(|| PathBuf::from(".ncofind/models"))
}
