use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edugraph::api::ApiServer;
use edugraph::config::Config;
use edugraph::llm::GeminiClient;
use edugraph::loader::Loader;
use edugraph::search::SearchPipeline;
use edugraph::store::SparqlStore;

#[derive(Parser)]
#[command(
    name = "edugraph",
    version,
    about = "Education-ontology SPARQL API with natural-language search",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); environment variables otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Bind address override (e.g. 0.0.0.0:5000)
        #[arg(short, long)]
        bind: Option<std::net::SocketAddr>,
    },

    /// Load a Turtle dataset into Fuseki and verify the counts
    Load {
        /// Turtle file to upload
        file: PathBuf,

        /// Clear the dataset before loading
        #[arg(long, default_value = "false")]
        clear: bool,
    },

    /// Run the natural-language search pipeline once and print results
    Search {
        /// Question to answer
        question: String,
    },

    /// Check the Fuseki connection and print the data summary
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate()?;

    match cli.command {
        Commands::Serve { bind } => {
            let mut config = config;
            if let Some(addr) = bind {
                config.server.bind_address = addr;
            }
            serve(config).await?;
        }

        Commands::Load { file, clear } => {
            tracing::info!(file = %file.display(), clear, "starting load command");
            load(config, &file, clear).await?;
        }

        Commands::Search { question } => {
            tracing::info!(question = %question, "starting search command");
            search(config, &question).await?;
        }

        Commands::Check => {
            check(config).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("edugraph=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("edugraph=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    let server = ApiServer::new(config)?;

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    };

    server.start_with_shutdown(shutdown).await?;
    Ok(())
}

async fn load(config: Config, file: &std::path::Path, clear: bool) -> Result<()> {
    let store = SparqlStore::with_timeout(&config.store.endpoint, config.store_timeout())?;
    let loader = Loader::new(store);

    let counts = loader.run(file, clear).await?;

    println!("Entités chargées dans le dataset :");
    println!("{:-<48}", "");
    for entry in &counts {
        let marker = if entry.count > 0 { '✓' } else { '✗' };
        println!("  {} {:30} {:4} entité(s)", marker, entry.label, entry.count);
    }
    println!("{:-<48}", "");

    Ok(())
}

async fn search(config: Config, question: &str) -> Result<()> {
    let store = SparqlStore::with_timeout(&config.store.endpoint, config.store_timeout())?;
    let gemini = GeminiClient::new(config.gemini.clone())?;
    let pipeline = SearchPipeline::new(gemini);

    let outcome = pipeline.answer(question, &store).await;

    println!("SPARQL query:\n{}\n", outcome.sparql_query);
    match outcome.result {
        Ok(rows) => {
            println!("{} résultat(s)", rows.len());
            for row in rows {
                println!("{}", serde_json::to_string(&row)?);
            }
        }
        Err(e) => {
            eprintln!("Erreur SPARQL: {e}");
        }
    }

    Ok(())
}

async fn check(config: Config) -> Result<()> {
    let store = SparqlStore::with_timeout(&config.store.endpoint, config.store_timeout())?;

    let total = store
        .query("SELECT (COUNT(*) as ?count) WHERE { ?s ?p ?o }")
        .await?;
    let count = total
        .first()
        .and_then(|row| row.get("count"))
        .cloned()
        .unwrap_or_else(|| "0".to_string());

    println!("Connexion Fuseki OK ({})", store.endpoint());
    println!("  Triplets: {count}");

    Ok(())
}
