//! Command-line interface for file-ingest
//!
//! # Usage Examples
//!
//! ```bash
//! # Emit a file as one record; progress is committed next to the file
//! file-ingest /data/in/report.txt
//!
//! # Keep tracker files elsewhere and read Latin-1 input
//! file-ingest /data/in/report.txt \
//!   --tracker-dir /var/lib/file-ingest \
//!   --input-charset ISO-8859-1
//!
//! # Dry run: read without committing
//! file-ingest /data/in/report.txt --no-commit
//! ```
//!
//! ## Config File
//! ```toml
//! [deserializer]
//! outputCharset = "UTF-8"
//! maxLineLength = 2048
//! fileSuffix = "\r\nflumeFileSuffix"
//! ```

use clap::Parser;
use file_ingest::{ingest, IngestOpts};

#[derive(Parser)]
#[command(name = "file-ingest")]
#[command(about = "Ingest a file as a single record with crash-consistent resume")]
#[command(long_about = None)]
struct Cli {
    #[command(flatten)]
    opts: IngestOpts,
}

fn main() -> anyhow::Result<()> {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let count = ingest(&cli.opts, &mut out)?;

    tracing::info!("Wrote {} events", count);
    Ok(())
}
