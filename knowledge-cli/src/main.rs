//! Command-line entry point for the knowledge-core maintenance jobs
//!
//! Three one-shot jobs: `migrate` (JSON → database), `index` (database →
//! embeddings), and `verify` (schema + content counts). Each exits 0 on
//! success and 1 with a single-line reason on failure.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gm_knowledge_core::config::CoreConfig;
use gm_knowledge_core::embeddings;
use gm_knowledge_core::ContentPack;
use gm_knowledge_storage::{jobs, ContentStore};

#[derive(Parser)]
#[command(name = "gm-knowledge")]
#[command(about = "Maintenance jobs for the gamemaster knowledge catalog")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Database URL, overriding the configuration
    #[arg(long, value_name = "URL")]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate SRD JSON files into the catalog
    #[command(alias = "mig")]
    Migrate {
        /// Directory holding the 5e-SRD-*.json files
        #[arg(long, value_name = "DIR", default_value = "data/5e-database")]
        data_dir: PathBuf,

        /// Content pack id to tag the rows with
        #[arg(long, default_value = "dnd_5e_srd")]
        pack_id: String,

        /// Content pack version
        #[arg(long, default_value = "5.1")]
        pack_version: String,

        /// Re-migrate files already recorded as completed
        #[arg(long)]
        force: bool,
    },
    /// Generate embeddings for the retrieval-enabled tables
    #[command(alias = "idx")]
    Index {
        /// Embedding model name, overriding the configuration
        #[arg(long)]
        model: Option<String>,

        /// Re-embed rows that already have a vector
        #[arg(long)]
        force: bool,
    },
    /// Check schema integrity and report content counts
    Verify,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.store.url = db;
    }

    match cli.command {
        Commands::Migrate {
            data_dir,
            pack_id,
            pack_version,
            force,
        } => {
            let store = ContentStore::open(config.store).await?;
            let mut pack = ContentPack::new(&pack_id, &pack_id, &pack_version);
            pack.author = Some("5e-database".to_string());
            let summary = jobs::migrate::run(&store, &data_dir, &pack, force).await?;
            println!(
                "migrated {} files ({} skipped): {} records inserted, {} invalid records skipped",
                summary.files_processed,
                summary.files_skipped,
                summary.records_inserted,
                summary.records_skipped
            );
            Ok(())
        }
        Commands::Index { model, force } => {
            if let Some(model) = model {
                config.embedding.model_name = model;
            }
            let store = ContentStore::open(config.store).await?;
            let embedder = embeddings::default_provider(&config.embedding);
            let summary = jobs::index::run(&store, &embedder, &config.embedding, force).await?;
            println!(
                "indexed {} tables: {} rows embedded, {} rows already current",
                summary.tables_processed, summary.rows_embedded, summary.rows_skipped
            );
            Ok(())
        }
        Commands::Verify => {
            let store = ContentStore::open(config.store).await?;
            let report = jobs::verify::run(&store).await?;

            for (table, count) in &report.counts {
                let embedded = report.embedded_counts.get(table).copied().unwrap_or(0);
                println!("{table}: {count} rows ({embedded} embedded)");
            }
            for pack in &report.packs {
                println!(
                    "pack {} v{} ({})",
                    pack.id,
                    pack.version,
                    if pack.is_active { "active" } else { "inactive" }
                );
            }

            if !report.missing_tables.is_empty() {
                anyhow::bail!("missing tables: {}", report.missing_tables.join(", "));
            }
            if report.packs.is_empty() {
                anyhow::bail!("no content packs found; run migrate first");
            }
            println!("verification passed: {} total rows", report.total_rows());
            Ok(())
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<CoreConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("cannot read config {}: {e}", path.display()))?;
            Ok(toml::from_str(&raw)?)
        }
        None => Ok(CoreConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[store]\nurl = \"file:custom.db\"\n[embedding]\ndimension = 768\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.store.url, "file:custom.db");
        assert_eq!(config.embedding.dimension, 768);
        // Untouched sections keep their defaults
        assert_eq!(config.prompt.max_tokens_budget, 128_000);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        assert!(load_config(Some(std::path::Path::new("/nonexistent/config.toml"))).is_err());
    }
}
