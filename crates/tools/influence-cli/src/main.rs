use anyhow::{anyhow, Context, Result};
use clap::Parser;
use colored::Colorize;
use influence_cache::{
    FetchError, ManagerConfig, ProfileManager, ProfileObserver, RequestOutcome, SchemaVersion,
};
use influence_types::{Direction, Key, ProfileRecord, Query};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Query influence profiles through the caching client", long_about = None)]
struct Args {
    /// Access credential for the scoring service.
    api_key: String,

    /// score, detail (or user), topics, influenced_by, influencer_of, influence
    query: Query,

    /// Handles to look up.
    #[clap(required = true)]
    users: Vec<String>,

    /// Service generation to talk to (v1 or v2). Overrides the config file.
    #[clap(long, value_parser)]
    schema: Option<SchemaVersion>,

    /// Optional TOML file with manager settings.
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,

    /// Skip the cache and always ask the service.
    #[clap(long)]
    force: bool,

    /// Seconds to wait for outstanding fetches before giving up.
    #[clap(long, default_value_t = 30)]
    timeout: u64,
}

/// Prints every record it receives and remembers failures.
#[derive(Default)]
struct Printer {
    failures: Mutex<Vec<String>>,
}

impl ProfileObserver for Printer {
    fn on_update(&self, record: &ProfileRecord) {
        print_record(record);
    }

    fn on_error(&self, key: &Key, query: Query, error: &FetchError) {
        let line = format!("{} {}: {}", key, query, error);
        eprintln!("{} {}", "failed".red().bold(), line);
        self.failures.lock().push(line);
    }
}

fn print_record(record: &ProfileRecord) {
    let score = record
        .score()
        .map(|s| format!("{:.2}", s))
        .unwrap_or_else(|| "-".to_string());
    println!("{} {}", record.key().as_str().bold(), score.green());

    if let Some(changes) = record.summary().and_then(|s| s.changes) {
        println!(
            "  change: day {:+.2}, week {:+.2}, month {:+.2}",
            changes.day, changes.week, changes.month
        );
    }
    if let Some(detail) = record.detail() {
        println!("  class: {} ({})", detail.class_name.cyan(), detail.class_description);
        println!(
            "  network {:.1}, amplification {:.1}, true reach {:.0}",
            detail.network, detail.amplification, detail.true_reach
        );
    }
    if let Some(topics) = record.topic_names() {
        println!("  topics: {}", topics.join(", "));
    }
    for direction in [Direction::InfluencedBy, Direction::InfluencerOf] {
        if let Some(entries) = record.related(direction) {
            println!("  {}:", direction.to_string().yellow());
            for entry in entries {
                println!("    {} {:.2}", entry.key, entry.score);
            }
        }
    }
}

fn load_config(args: &Args) -> Result<ManagerConfig> {
    let mut config = match &args.config {
        Some(path) => ManagerConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => ManagerConfig::default(),
    };
    config = config.with_api_key(args.api_key.clone());
    if let Some(schema) = args.schema {
        config = config.with_schema(schema);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    let log_level_str = config.log_level.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level_str))
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));
    fmt::Subscriber::builder().with_env_filter(filter).init();

    let manager = ProfileManager::new(config).context("Failed to start profile manager")?;
    let printer = Arc::new(Printer::default());
    manager.subscribe(printer.clone());

    let mut rejected = 0usize;
    for user in &args.users {
        match manager.request(user.as_str(), args.query, args.force) {
            Ok(RequestOutcome::Cached) => info!("{} served from cache", user),
            Ok(RequestOutcome::Dispatched) => {}
            Err(e) => {
                eprintln!("{} {}", "rejected".red().bold(), e);
                rejected += 1;
            }
        }
    }

    let wait = Duration::from_secs(args.timeout);
    if tokio::time::timeout(wait, manager.wait_idle()).await.is_err() {
        warn!(
            "gave up after {:?} with {} fetches outstanding",
            wait,
            manager.in_flight()
        );
    }

    let failed = printer.failures.lock().len() + rejected;
    if failed > 0 {
        return Err(anyhow!("{} of {} requests failed", failed, args.users.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use influence_types::RemoteError;

    #[test]
    fn printer_collects_every_failure() {
        let printer = Printer::default();
        let error = FetchError::from(RemoteError::Status {
            status: 403,
            body: "Developer Inactive".into(),
        });
        printer.on_error(&Key::from("alice"), Query::Score, &error);
        printer.on_error(&Key::from("bob"), Query::Topics, &error);

        let failures = printer.failures.lock();
        assert_eq!(failures.len(), 2);
        assert!(failures[0].starts_with("alice score"));
        assert!(failures[1].contains("403"));
    }
}
