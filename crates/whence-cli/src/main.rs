//! whence: ingest operation logs and ask where a character came from.
//!
//! Usage:
//!   # Append JSON-lines batches (one array of drafts, or one draft, per line)
//!   whence ingest trace.jsonl
//!
//!   # Walk character 9 of record #12 back to its origin
//!   whence traverse 12 9
//!
//!   # Resolve character 40 of a captured markup snapshot, then trace it
//!   whence resolve snapshot.json 40 --trace

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use whence_markup::MarkupSnapshot;
use whence_store::{Fetch, RecordStore, StoreConfig, open_store};
use whence_trace::{RuleTable, TraverseOptions, Tracer};
use whence_types::{RecordDraft, RecordId};

mod config;

/// Data-provenance tracer for string values.
#[derive(Parser, Debug)]
#[command(name = "whence")]
#[command(about = "Trace string characters back to the operations that produced them")]
struct Args {
    /// Config script (default: $XDG_CONFIG_HOME/whence/config.rhai)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database holding the record log
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Append record batches from a JSON-lines file
    Ingest { file: PathBuf },

    /// Print one record as JSON
    Show { id: RecordId },

    /// Trace a character of a record's value back to its origin
    Traverse {
        id: RecordId,
        char_index: usize,
        /// Stop at the first record that has not arrived yet instead of failing
        #[arg(long)]
        optimistic: bool,
    },

    /// List records emitted at a source location (`file:line:column`)
    Locate { key: String },

    /// Resolve a character of serialized markup to its assigned string
    Resolve {
        snapshot: PathBuf,
        char_index: usize,
        /// Also trace the resolved character
        #[arg(long)]
        trace: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Output goes to stdout; logs stay on stderr.
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = config::load_config(args.config.as_deref())?;
    let store_config = StoreConfig {
        path: args
            .db
            .or(settings.store.path)
            .or_else(config::default_db_path),
        batch: settings.store.batch,
    };
    if store_config.path.is_none() {
        tracing::warn!("no data directory found, using an in-memory store");
    }

    let store = open_store(&store_config).context("failed to open record store")?;
    let tracer = Tracer::with_config(store, RuleTable::default(), settings.traverse);

    let result = run(&tracer, args.command).await;
    tracer.store().flush().context("failed to flush record store")?;
    result
}

async fn run(tracer: &Tracer, command: Command) -> Result<()> {
    match command {
        Command::Ingest { file } => {
            let batches = read_batches(&file)?;
            let mut total = 0;
            for (line, batch) in batches {
                let ids = tracer
                    .ingest(batch)
                    .with_context(|| format!("{}:{line}: batch rejected", file.display()))?;
                total += ids.len();
                print_json(&ids)?;
            }
            tracing::info!(total, file = %file.display(), "ingest complete");
        }
        Command::Show { id } => match tracer.store().get(id)? {
            Fetch::Found(record) => print_json(&*record)?,
            Fetch::NotYetAvailable => bail!("record {id} is not yet available"),
            Fetch::NotFound => bail!("record {id} not found"),
        },
        Command::Traverse {
            id,
            char_index,
            optimistic,
        } => {
            match tracer
                .traverse(id, char_index, TraverseOptions { optimistic })
                .await
            {
                Ok(trace) => print_json(&trace)?,
                Err(e) => {
                    // Partial trail first, then the failure.
                    if !e.steps().is_empty() {
                        print_json(&serde_json::json!({ "steps": e.steps() }))?;
                    }
                    return Err(e.into());
                }
            }
        }
        Command::Locate { key } => {
            print_json(&tracer.store().find_by_location(&key)?)?;
        }
        Command::Resolve {
            snapshot,
            char_index,
            trace,
        } => {
            let json = std::fs::read_to_string(&snapshot)
                .with_context(|| format!("failed to read {}", snapshot.display()))?;
            let snapshot: MarkupSnapshot = serde_json::from_str(&json)
                .with_context(|| format!("invalid snapshot {}", snapshot.display()))?;

            if trace {
                match tracer
                    .inspect_markup_char(&snapshot, char_index, TraverseOptions::default())
                    .await?
                {
                    Some(inspection) => print_json(&inspection)?,
                    None => bail!("no origin covers character {char_index}"),
                }
            } else {
                match tracer.resolve_markup_char(&snapshot, char_index) {
                    Some(origin) => print_json(&origin)?,
                    None => bail!("no origin covers character {char_index}"),
                }
            }
        }
    }
    Ok(())
}

/// Parse a JSON-lines file into batches, keyed by 1-based line number.
///
/// Each line holds either an array of drafts or a single draft. Blank lines
/// are skipped.
fn read_batches(path: &Path) -> Result<Vec<(usize, Vec<RecordDraft>)>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut batches = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        let batch = parse_batch(&line)
            .with_context(|| format!("{}:{line_no}: invalid batch", path.display()))?;
        batches.push((line_no, batch));
    }
    Ok(batches)
}

fn parse_batch(line: &str) -> Result<Vec<RecordDraft>> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    Ok(if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    })
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
