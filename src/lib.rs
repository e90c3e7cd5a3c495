//! file-ingest Library
//!
//! Ingests files as whole records. Each file is read through a resettable
//! source whose committed position is stored next to the data, so an
//! interrupted run resumes from the last commit instead of starting over.
//!
//! # Crates
//!
//! - `position_tracker` - Committed position storage (in memory or JSON file)
//! - `ingest_file` - Resettable character sources over files and buffers
//! - `ingest_deserializer` - Event deserializers, including the whole-file one
//!
//! # CLI Usage
//!
//! ```bash
//! # Emit data.txt as one record followed by the default suffix
//! file-ingest data.txt
//!
//! # Custom suffix and output charset from a config file
//! file-ingest data.txt --config ingest.toml
//! ```

use anyhow::Context as _;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

use ingest_deserializer::{Context, EventDeserializer, EventDeserializerFactory};
use ingest_file::{Charset, DecodeErrorPolicy, ResettableFileSource, SourceConfig};
use position_tracker::{tracker_path_for, DurablePositionTracker};

pub use ingest_deserializer as deserializer;
pub use ingest_file as file;
pub use position_tracker as tracker;

/// Prefix of deserializer settings in the config file
pub const DESERIALIZER_PREFIX: &str = "deserializer.";

#[derive(Parser, Clone, Debug)]
pub struct IngestOpts {
    /// File to ingest
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Deserializer type
    #[arg(long, default_value = "FILE")]
    pub deserializer: String,

    /// TOML config file; keys under [deserializer] configure the deserializer
    /// (outputCharset, maxLineLength, fileSuffix)
    #[arg(long, value_name = "PATH", env = "FILE_INGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Charset of the input file
    #[arg(long, default_value = "UTF-8")]
    pub input_charset: String,

    /// What to do with malformed input: FAIL, REPLACE or IGNORE
    #[arg(long, default_value = "FAIL")]
    pub decode_error_policy: String,

    /// Directory for position tracker files (default: next to the input file)
    #[arg(long, value_name = "DIR", env = "FILE_INGEST_TRACKER_DIR")]
    pub tracker_dir: Option<PathBuf>,

    /// Maximum number of events read per batch
    #[arg(long, default_value = "100")]
    pub batch_size: usize,

    /// Do not commit progress; the next run starts from the previous commit
    #[arg(long)]
    pub no_commit: bool,
}

/// Load the deserializer context from the config file, if any.
pub fn load_context(opts: &IngestOpts) -> anyhow::Result<Context> {
    match &opts.config {
        Some(path) => {
            let context = Context::from_toml_file(path)?;
            Ok(context.sub_properties(DESERIALIZER_PREFIX))
        }
        None => Ok(Context::new()),
    }
}

/// Ingest one file, writing each event body to `out`.
///
/// After every delivered batch the position is committed, unless
/// `no_commit` is set. Returns the number of events written.
pub fn ingest<W: Write>(opts: &IngestOpts, out: &mut W) -> anyhow::Result<usize> {
    ingest_with_factory(opts, &EventDeserializerFactory::new(), out)
}

/// Like [`ingest`], resolving `opts.deserializer` through `factory` so
/// custom deserializers can be used.
///
/// The deserializer is closed on failure too, which rewinds the source to
/// the last commit before the error is returned.
pub fn ingest_with_factory<W: Write>(
    opts: &IngestOpts,
    factory: &EventDeserializerFactory,
    out: &mut W,
) -> anyhow::Result<usize> {
    if opts.batch_size == 0 {
        anyhow::bail!("Batch size must be at least 1");
    }

    let context = load_context(opts)?;
    let source_config = SourceConfig {
        input_charset: opts.input_charset.parse::<Charset>()?,
        decode_error_policy: opts.decode_error_policy.parse::<DecodeErrorPolicy>()?,
        ..Default::default()
    };

    let target = opts.path.display().to_string();
    let tracker_path = tracker_path_for(&opts.path, opts.tracker_dir.as_deref());
    let tracker = DurablePositionTracker::open(tracker_path, target.clone())?;
    let source = ResettableFileSource::open_with(&opts.path, Box::new(tracker), source_config)?;

    let mut deserializer = factory.get_instance(&opts.deserializer, &context, Box::new(source))?;

    tracing::info!("Ingesting {} with {} deserializer", target, opts.deserializer);

    let total = match deliver(deserializer.as_mut(), opts, out) {
        Ok(total) => total,
        Err(e) => {
            if let Err(close_err) = deserializer.close() {
                tracing::warn!("Failed to close deserializer for {}: {}", target, close_err);
            }
            return Err(e);
        }
    };
    deserializer.close()?;

    tracing::info!("Completed ingestion of {} events from {}", total, target);
    Ok(total)
}

fn deliver<W: Write>(
    deserializer: &mut dyn EventDeserializer,
    opts: &IngestOpts,
    out: &mut W,
) -> anyhow::Result<usize> {
    let mut total = 0;
    loop {
        let events = deserializer.read_events(opts.batch_size)?;
        if events.is_empty() {
            return Ok(total);
        }

        for event in &events {
            out.write_all(event.body())
                .context("Failed to write event")?;
        }
        out.flush().context("Failed to flush output")?;
        total += events.len();

        if !opts.no_commit {
            deserializer.mark()?;
        }
    }
}
