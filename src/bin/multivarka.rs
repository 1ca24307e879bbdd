use bson::{Bson, Document};
use clap::{Args, Parser, Subcommand};
use multivarka::config::{ClientConfig, LogConfig};
use multivarka::store::{Driver, MemoryDriver};
use multivarka::{Builder, logger};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(name = "multivarka", version, about = "Run fluent document queries from the shell", long_about = None)]
struct Cli {
    /// Path to a config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Connection string, e.g. file:///var/lib/multivarka or memory://scratch
    #[arg(long)]
    uri: Option<String>,
    /// Collection to operate on
    #[arg(long, short)]
    collection: Option<String>,
    /// error|warn|info|debug|trace
    #[arg(long)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

/// Values are JSON; anything that is not valid JSON is taken as a string.
#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    /// Field the comparisons apply to
    #[arg(long = "where", value_name = "FIELD")]
    field: Option<String>,
    /// Negate the comparisons
    #[arg(long)]
    not: bool,
    #[arg(long, value_name = "JSON")]
    equal: Option<String>,
    #[arg(long, value_name = "JSON")]
    less_than: Option<String>,
    #[arg(long, value_name = "JSON")]
    greater_than: Option<String>,
    /// JSON array of candidate values
    #[arg(long, value_name = "JSON_ARRAY")]
    include: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Print matching documents as NDJSON")]
    Find {
        #[command(flatten)]
        filter: FilterArgs,
    },
    #[command(about = "Delete matching documents")]
    Remove {
        #[command(flatten)]
        filter: FilterArgs,
    },
    #[command(about = "Assign fields on every matching document")]
    Update {
        #[command(flatten)]
        filter: FilterArgs,
        /// Assignment as FIELD=JSON; repeatable
        #[arg(long = "set", value_name = "FIELD=JSON", required = true)]
        set: Vec<String>,
    },
    #[command(about = "Insert one JSON document")]
    Insert {
        #[arg(long, value_name = "JSON")]
        doc: String,
    },
}

fn parse_value(raw: &str) -> Bson {
    serde_json::from_str::<Bson>(raw).unwrap_or_else(|_| Bson::String(raw.to_string()))
}

fn split_assignment(raw: &str) -> CliResult<(String, Bson)> {
    let (field, value) = raw.split_once('=').ok_or_else(|| format!("expected FIELD=JSON, got {raw:?}"))?;
    if field.is_empty() {
        return Err(format!("empty field name in {raw:?}").into());
    }
    Ok((field.to_string(), parse_value(value)))
}

fn apply_filter(mut chain: Builder, args: &FilterArgs) -> CliResult<Builder> {
    if let Some(field) = &args.field {
        chain = chain.where_(field.as_str());
    }
    if args.not {
        chain = chain.not();
    }
    if let Some(v) = &args.equal {
        chain = chain.equal(parse_value(v));
    }
    if let Some(v) = &args.less_than {
        chain = chain.less_than(parse_value(v));
    }
    if let Some(v) = &args.greater_than {
        chain = chain.greater_than(parse_value(v));
    }
    if let Some(v) = &args.include {
        let values: Vec<Bson> = serde_json::from_str(v).map_err(|e| format!("--include expects a JSON array: {e}"))?;
        chain = chain.include(values);
    }
    Ok(chain)
}

fn report<T: Serialize>(value: &T) -> CliResult<Vec<String>> {
    Ok(vec![serde_json::to_string(value)?])
}

async fn run(base: Builder, command: Commands) -> CliResult<Vec<String>> {
    match command {
        Commands::Find { filter } => {
            let docs = apply_filter(base, &filter)?.find().await?;
            let mut lines = Vec::with_capacity(docs.len());
            for d in &docs {
                lines.push(serde_json::to_string(d)?);
            }
            Ok(lines)
        }
        Commands::Remove { filter } => report(&apply_filter(base, &filter)?.remove().await?),
        Commands::Update { filter, set } => {
            let mut chain = apply_filter(base, &filter)?;
            for raw in &set {
                let (field, value) = split_assignment(raw)?;
                chain = chain.set(field, value);
            }
            report(&chain.update().await?)
        }
        Commands::Insert { doc } => {
            let document: Document = serde_json::from_str(&doc)?;
            report(&base.insert(document).await?)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let overrides = ClientConfig {
        uri: cli.uri.clone(),
        collection: cli.collection.clone(),
        log: LogConfig { level: cli.log_level.clone(), ..LogConfig::default() },
    };
    let cfg = match ClientConfig::load(overrides, cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("config error: {e}");
            return ExitCode::from(2);
        }
    };
    if let Err(e) = logger::configure_logging(
        cfg.log.dir.as_deref(),
        Some(cfg.log.level.as_deref().unwrap_or("warn")),
        cfg.log.retention,
    ) {
        eprintln!("logging disabled: {e}");
    }
    let Some(collection) = cfg.collection.clone() else {
        eprintln!("no collection given (use --collection, MULTIVARKA_COLLECTION or the config file)");
        return ExitCode::from(2);
    };
    let driver: Arc<dyn Driver> = Arc::new(MemoryDriver::new());
    let base = Builder::new(driver).server(cfg.uri()).collection(collection);
    match run(base, cli.command).await {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
