//! Malicious Site Protection CLI
//!
//! CLI tool for inspecting and updating protection datasets on disk.

mod data;

use std::path::Path;
use std::time::Instant;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use msp_core::{DataKind, StoredDataType, ThreatKind};

use crate::data::StoreOptions;

#[derive(Parser)]
#[command(name = "msp-cli")]
#[command(about = "Malicious site protection dataset tools")]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show revision and size of every dataset slot
    Info {
        /// Persisted dataset directory
        #[arg(short, long)]
        data_dir: String,

        /// Embedded snapshot directory
        #[arg(short, long)]
        embedded_dir: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Apply a change-set file to one dataset slot
    Apply {
        #[arg(short, long)]
        data_dir: String,

        #[arg(short, long)]
        embedded_dir: Option<String>,

        /// Store config JSON file
        #[arg(long)]
        config: Option<String>,

        /// Threat kind (phishing, malware, scam)
        #[arg(short, long)]
        threat: ThreatKind,

        /// Data kind (hashPrefixSet, filterSet)
        #[arg(short, long)]
        kind: DataKind,

        /// Change-set JSON file
        #[arg(short, long)]
        change_set: String,
    },

    /// Load every slot from embedded snapshots and write it to the data directory
    Bootstrap {
        #[arg(short, long)]
        data_dir: String,

        #[arg(short, long)]
        embedded_dir: String,
    },

    /// Test a hash prefix or list the patterns for a full hash
    Lookup {
        #[arg(short, long)]
        data_dir: String,

        #[arg(short, long)]
        embedded_dir: Option<String>,

        #[arg(short, long)]
        threat: ThreatKind,

        /// Hash prefix to test against the prefix set
        #[arg(long, conflicts_with = "hash", required_unless_present = "hash")]
        prefix: Option<String>,

        /// Full hash whose filter patterns to list
        #[arg(long)]
        hash: Option<String>,
    },

    /// Build an embedded snapshot file from a JSON array of elements
    Embed {
        /// JSON array of prefixes or filter records
        #[arg(short, long)]
        input: String,

        #[arg(short, long)]
        kind: DataKind,

        #[arg(short, long, default_value_t = 0)]
        revision: u64,

        /// Output snapshot file
        #[arg(short, long)]
        output: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Info {
            data_dir,
            embedded_dir,
            json,
        } => cmd_info(&data_dir, embedded_dir.as_deref(), json),
        Commands::Apply {
            data_dir,
            embedded_dir,
            config,
            threat,
            kind,
            change_set,
        } => cmd_apply(
            &StoreOptions {
                data_dir: &data_dir,
                embedded_dir: embedded_dir.as_deref(),
                config: config.as_deref(),
            },
            StoredDataType::new(threat, kind),
            &change_set,
        ),
        Commands::Bootstrap {
            data_dir,
            embedded_dir,
        } => cmd_bootstrap(&data_dir, &embedded_dir),
        Commands::Lookup {
            data_dir,
            embedded_dir,
            threat,
            prefix,
            hash,
        } => cmd_lookup(&data_dir, embedded_dir.as_deref(), threat, prefix.as_deref(), hash.as_deref()),
        Commands::Embed {
            input,
            kind,
            revision,
            output,
        } => cmd_embed(&input, kind, revision, &output),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SlotInfo {
    threat_kind: ThreatKind,
    data_kind: DataKind,
    revision: Option<u64>,
    entries: Option<usize>,
    error: Option<String>,
}

fn cmd_info(data_dir: &str, embedded_dir: Option<&str>, json: bool) -> Result<(), String> {
    let manager = data::open_manager(&StoreOptions {
        data_dir,
        embedded_dir,
        config: None,
    })?;

    let slots: Vec<SlotInfo> = StoredDataType::all_cases()
        .into_iter()
        .map(|key| {
            let (revision, entries, error) = match manager.dataset(key) {
                Ok(dataset) => (Some(dataset.revision()), Some(dataset.len()), None),
                Err(e) => (None, None, Some(e.to_string())),
            };
            SlotInfo {
                threat_kind: key.threat_kind(),
                data_kind: key.data_kind(),
                revision,
                entries,
                error,
            }
        })
        .collect();

    if json {
        let out = serde_json::to_string_pretty(&slots)
            .map_err(|e| format!("Failed to serialize JSON: {}", e))?;
        println!("{}", out);
        return Ok(());
    }

    println!("Data directory: {}", data_dir);
    for slot in &slots {
        let key = format!("{}/{}", slot.threat_kind, slot.data_kind);
        match (slot.revision, slot.entries, &slot.error) {
            (Some(revision), Some(entries), _) => {
                println!("  {:<24} revision {:>8}  {:>8} entries", key, revision, entries)
            }
            (_, _, Some(error)) => println!("  {:<24} unavailable: {}", key, error),
            _ => println!("  {:<24} unavailable", key),
        }
    }

    Ok(())
}

fn cmd_apply(opts: &StoreOptions<'_>, key: StoredDataType, change_set_path: &str) -> Result<(), String> {
    let start = Instant::now();
    let manager = data::open_manager(opts)?;
    let change_set = data::read_change_set(Path::new(change_set_path), key.data_kind())?;

    // A replacing change set may create a slot that has no data yet.
    let before = match manager.revision(key) {
        Ok(revision) => revision.to_string(),
        Err(e) if change_set.is_replace() => {
            info!("Starting {} from scratch: {}", key, e);
            "none".to_string()
        }
        Err(e) => return Err(e.to_string()),
    };
    let (inserted, deleted) = change_set.counts();
    let replace = change_set.is_replace();

    let after = manager
        .apply_change_set(key, change_set)
        .map_err(|e| e.to_string())?;

    if !manager.config().persist_on_apply {
        manager.persist(key).map_err(|e| e.to_string())?;
    }

    let dataset = manager.dataset(key).map_err(|e| e.to_string())?;
    println!("Applied change set to {}", key);
    println!("  Revision: {} -> {}", before, after);
    println!("  Mode:     {}", if replace { "replace" } else { "incremental" });
    println!("  Changes:  +{} -{}", inserted, deleted);
    println!("  Entries:  {}", dataset.len());
    println!("  Time:     {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);

    Ok(())
}

fn cmd_bootstrap(data_dir: &str, embedded_dir: &str) -> Result<(), String> {
    let manager = data::open_manager(&StoreOptions {
        data_dir,
        embedded_dir: Some(embedded_dir),
        config: None,
    })?;

    for key in StoredDataType::all_cases() {
        manager.persist(key).map_err(|e| e.to_string())?;
        let revision = manager.revision(key).map_err(|e| e.to_string())?;
        info!("Wrote {} at revision {}", key, revision);
    }

    println!("Bootstrapped {} datasets into '{}'", StoredDataType::COUNT, data_dir);
    Ok(())
}

fn cmd_lookup(
    data_dir: &str,
    embedded_dir: Option<&str>,
    threat: ThreatKind,
    prefix: Option<&str>,
    hash: Option<&str>,
) -> Result<(), String> {
    let manager = data::open_manager(&StoreOptions {
        data_dir,
        embedded_dir,
        config: None,
    })?;

    if let Some(prefix) = prefix {
        let dataset = manager
            .dataset(StoredDataType::HashPrefixSet(threat))
            .map_err(|e| e.to_string())?;
        let hit = dataset
            .as_hash_prefixes()
            .is_some_and(|set| set.contains(prefix));
        println!("{} prefix {}: {}", threat, prefix, if hit { "present" } else { "absent" });
    }

    if let Some(hash) = hash {
        let dataset = manager
            .dataset(StoredDataType::FilterSet(threat))
            .map_err(|e| e.to_string())?;
        match dataset.as_filters().and_then(|dict| dict.get(hash)) {
            Some(patterns) => {
                let mut patterns: Vec<&String> = patterns.iter().collect();
                patterns.sort_unstable();
                println!("{} hash {}: {} pattern(s)", threat, hash, patterns.len());
                for pattern in patterns {
                    println!("  {}", pattern);
                }
            }
            None => println!("{} hash {}: unknown", threat, hash),
        }
    }

    Ok(())
}

fn cmd_embed(input: &str, kind: DataKind, revision: u64, output: &str) -> Result<(), String> {
    let (bytes, count) = data::build_embedded(Path::new(input), kind, revision)?;
    data::write_file(Path::new(output), &bytes)?;

    println!("Wrote {} {} item(s) at revision {} to '{}'", count, kind, revision, output);
    Ok(())
}
