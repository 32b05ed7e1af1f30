//! logkv Log Checker
//!
//! Offline integrity check for a logkv log file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use logkv::log::{LogReader, LogRecovery};
use tracing_subscriber::{fmt, EnvFilter};

/// logkv log checker
#[derive(Parser, Debug)]
#[command(name = "logkv-check")]
#[command(about = "Verify (and optionally repair) a logkv log file")]
#[command(version)]
struct Args {
    /// Log file to check
    path: PathBuf,

    /// Truncate a partial record at the end of the log
    #[arg(short, long)]
    repair: bool,

    /// Log every record header
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing/logging
    let default_filter = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt().with_env_filter(filter).with_target(false).init();

    tracing::info!("logkv-check v{}", logkv::VERSION);
    tracing::info!("Log file: {}", args.path.display());

    if args.verbose {
        dump_records(&args.path);
    }

    let stats = match LogRecovery::verify(&args.path) {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!("Log is corrupt: {}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        records = stats.records_scanned,
        tombstones = stats.tombstones,
        live_keys = stats.live_keys,
        valid_bytes = stats.valid_bytes,
        "scan complete"
    );

    if stats.is_clean() {
        tracing::info!("Log is clean");
        return ExitCode::SUCCESS;
    }

    tracing::warn!(
        offset = stats.valid_bytes,
        bytes = stats.partial_tail_bytes,
        "partial record at end of log"
    );

    if !args.repair {
        tracing::error!("Run with --repair to truncate the partial record");
        return ExitCode::FAILURE;
    }

    match LogRecovery::repair(&args.path) {
        Ok(dropped) => {
            tracing::info!("Truncated {} bytes", dropped);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Repair failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Log every record header until the first decode failure
fn dump_records(path: &std::path::Path) {
    let reader = match LogReader::open(path) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to open log: {}", e);
            return;
        }
    };

    for record in reader {
        match record {
            Ok(record) => tracing::debug!(
                offset = record.header.offset,
                klen = record.header.klen,
                vlen = record.header.vlen,
                tombstone = record.header.is_tombstone(),
                "record"
            ),
            Err(e) => {
                tracing::debug!("scan stopped: {}", e);
                break;
            }
        }
    }
}
