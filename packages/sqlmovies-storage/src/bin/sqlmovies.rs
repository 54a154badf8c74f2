//! sqlmovies CLI
//!
//! Stage snapshot maintenance and ad-hoc queries against a stage.
//!
//! # Usage
//!
//! ```bash
//! # Derive stage 07 from stage 06
//! cargo run --bin sqlmovies -- fork --from 06 --to 07
//!
//! # Run a raw query, or one of the stage 07 lesson queries by name
//! cargo run --bin sqlmovies -- query --stage 07 "SELECT count(*) AS n FROM movies"
//! cargo run --bin sqlmovies -- query --stage 07 --lesson top_keywords
//!
//! # Show which stages exist on disk
//! cargo run --bin sqlmovies -- list
//! ```

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sqlmovies_storage::{
    queries, rows_to_value, QueryExecutor, SnapshotStore, SqliteDatabase, StoreConfig,
};
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sqlmovies")]
#[command(about = "Stage snapshots for the SQL movies lessons", long_about = None)]
struct Cli {
    /// YAML store configuration (version 1)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Snapshot directory, overrides the configuration file
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy one stage's snapshot to another stage
    Fork {
        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,
    },

    /// Run SQL against a stage and print the rows as JSON
    Query {
        #[arg(short, long)]
        stage: String,

        /// Print only the first row
        #[arg(long)]
        single: bool,

        /// Run a named stage 07 lesson query instead of raw SQL
        #[arg(long, conflicts_with = "sql")]
        lesson: Option<String>,

        sql: Option<String>,
    },

    /// List stages present in the snapshot directory
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli, |key| std::env::var(key).ok())?;
    print!("{}", run(cli.command, config).await?);

    Ok(())
}

/// Execute one subcommand and return what it prints
async fn run(command: Commands, config: StoreConfig) -> anyhow::Result<String> {
    let mut out = String::new();

    match command {
        Commands::Fork { from, to } => {
            let db = SqliteDatabase::from_existing(&config, &from, &to)
                .await
                .with_context(|| format!("Failed to derive stage {} from stage {}", to, from))?;
            writeln!(out, "{}", db.path().display())?;
            db.close().await?;
        }
        Commands::Query {
            stage,
            single,
            lesson,
            sql,
        } => {
            let sql = select_sql(lesson.as_deref(), sql)?;

            let db = SqliteDatabase::open(&config, &stage).await?;
            let output = if single {
                db.select_single_row(&sql).await?.into_value()
            } else {
                rows_to_value(db.select_multiple_rows(&sql).await?)
            };
            writeln!(out, "{}", serde_json::to_string_pretty(&output)?)?;
            db.close().await?;
        }
        Commands::List => {
            let store = SnapshotStore::new(config)?;
            for stage in store.list()? {
                writeln!(out, "{}\t{}", stage, store.path_for(stage).display())?;
            }
        }
    }

    Ok(out)
}

/// Lesson name wins over raw SQL; clap already rejects passing both
fn select_sql(lesson: Option<&str>, sql: Option<String>) -> anyhow::Result<String> {
    match (lesson, sql) {
        (Some(name), _) => {
            let sql = queries::by_name(name).with_context(|| {
                let known: Vec<&str> = queries::ALL.iter().map(|(n, _)| *n).collect();
                format!("Unknown lesson query '{}'. Known: {}", name, known.join(", "))
            })?;
            Ok(sql.to_string())
        }
        (None, Some(sql)) => Ok(sql),
        (None, None) => bail!("Pass SQL text or --lesson <name>"),
    }
}

/// YAML file (or defaults), then `SQLMOVIES_*` overrides, then `--dir`
fn load_config(cli: &Cli, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<StoreConfig> {
    let config = match &cli.config {
        Some(path) => StoreConfig::from_yaml(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => StoreConfig::default(),
    };
    let config = config.with_overrides_from(env)?;
    Ok(match &cli.dir {
        Some(dir) => config.snapshot_dir(dir),
        None => config,
    })
}
