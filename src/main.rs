use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand, ValueEnum};
use fieldgraph_core::{DiscoveryConfig, Field, MemoryStore, TableRef};
use fieldgraph_graph::ModelBuilder;
use fieldgraph_query::{Algebra, Scope};
use fieldgraph_storage::ModelCatalog;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Dataset discovery over tabular fields
#[derive(Parser, Debug)]
#[command(name = "fieldgraph")]
#[command(about = "Find related, joinable and similar columns across tables", long_about = None)]
struct Args {
    /// Path to the data directory
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a model from a JSON column dump, then save a dump and a snapshot
    Build {
        /// JSON array of {database, table, column, values}
        #[arg(long)]
        columns: PathBuf,

        /// Model name
        #[arg(long)]
        name: String,

        /// Optional JSON config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Keyword search
    Search {
        /// Column dump the model was built from
        #[arg(long)]
        columns: PathBuf,

        #[arg(long)]
        model: String,

        #[arg(long)]
        keyword: String,

        #[arg(long, value_enum, default_value_t = ScopeArg::Content)]
        scope: ScopeArg,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Join paths between two tables, given as database.table
    JoinPath {
        #[arg(long)]
        model: String,

        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        #[arg(long, default_value_t = 2)]
        max_hops: usize,

        /// Follow content similarity instead of value overlap
        #[arg(long)]
        schema: bool,
    },
    /// List snapshots
    Snapshots {
        /// Only snapshots of this model
        #[arg(long)]
        model: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ScopeArg {
    Database,
    Table,
    Column,
    Content,
}

impl From<ScopeArg> for Scope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Database => Scope::Database,
            ScopeArg::Table => Scope::Table,
            ScopeArg::Column => Scope::Column,
            ScopeArg::Content => Scope::Content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ColumnRecord {
    database: String,
    table: String,
    column: String,
    values: Vec<String>,
}

fn load_columns(path: &Path, config: &DiscoveryConfig) -> anyhow::Result<MemoryStore> {
    let data = std::fs::read(path).with_context(|| format!("reading {:?}", path))?;
    let records: Vec<ColumnRecord> = serde_json::from_slice(&data).with_context(|| format!("parsing {:?}", path))?;

    let store = MemoryStore::new(config.signature.clone());
    for record in records {
        let field = Field::parse(&record.database, &record.table, &record.column)?;
        store.insert_column(field, record.values);
    }
    info!(columns = store.len(), "loaded column dump");
    Ok(store)
}

fn parse_table(name: &str) -> anyhow::Result<TableRef> {
    let (database, table) = name
        .split_once('.')
        .filter(|(d, t)| !d.is_empty() && !t.is_empty())
        .ok_or_else(|| anyhow!("table must be given as database.table, got '{}'", name))?;
    Ok(TableRef::new(database, table))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("fieldgraph v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {:?}", args.data_dir);

    let catalog = ModelCatalog::new(&args.data_dir)?;

    match args.command {
        Command::Build { columns, name, config } => {
            let config = match config {
                Some(path) => DiscoveryConfig::from_json_file(&path)?,
                None => DiscoveryConfig::default(),
            };
            let store = load_columns(&columns, &config)?;
            let model = ModelBuilder::new(config)?.build(name, &store)?;
            let stats = model.stats();
            let model = catalog.insert(model);
            catalog.save()?;
            let snapshot = catalog.create_snapshot(model.name())?;

            println!("{}", serde_json::to_string_pretty(&stats)?);
            println!("snapshot: {}", snapshot.name);
        }
        Command::Search { columns, model, keyword, scope, limit } => {
            let model = catalog.require(&model)?;
            let store = Arc::new(load_columns(&columns, model.config())?);
            let algebra = Algebra::new(model, store.clone(), store);
            let drs = algebra.keyword_search(&keyword, scope.into(), limit)?;
            print!("{}", drs.explain());
        }
        Command::JoinPath { model, from, to, max_hops, schema } => {
            let model = catalog.require(&model)?;
            let (from, to) = (parse_table(&from)?, parse_table(&to)?);
            let paths = if schema {
                model.schema_join_paths(&from, &to, max_hops)
            } else {
                model.join_paths(&from, &to, max_hops)
            };
            if paths.is_empty() {
                println!("no join path from {} to {} within {} hops", from, to, max_hops);
            }
            for path in paths {
                println!("{}", path);
            }
        }
        Command::Snapshots { model } => {
            let snapshots = match model {
                Some(name) => catalog.list_snapshots(&name)?,
                None => catalog.list_all_snapshots()?,
            };
            for snapshot in snapshots {
                println!(
                    "{}\t{}\t{}\t{}",
                    snapshot.model,
                    snapshot.name,
                    snapshot.size,
                    snapshot.creation_time.unwrap_or_default()
                );
            }
        }
    }

    Ok(())
}
