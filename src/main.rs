//! tinyimg: compress the JPEG and PNG images of a project with TinyPNG,
//! remembering what was already done so that repeated builds are cheap.

mod error;
mod walk;

use crate::error::{ErrorKind, Result};
use crate::walk::Discovery;
use clap::{ArgAction, Args, Parser, Subcommand};
use exn::ResultExt;
use futures::StreamExt;
use std::cell::Cell;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tinyimg_config::Config;
use tinyimg_ledger::Ledger;
use tinyimg_pipeline::{Ignore, Options, Processor, Summary, process_paths};
use tinyimg_remote::TinyPngClient;
use tinyimg_storage::CacheHandle;
use tinyimg_storage::backend::{LocalCache, ReadOnlyCache};

#[derive(Parser)]
#[command(name = "tinyimg", version, about)]
struct Cli {
    /// Project root; defaults to the current directory.
    #[arg(long, global = true, env = "TINYIMG_ROOT")]
    root: Option<PathBuf>,
    /// Additional configuration file, applied after the ones in the root.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// More output; repeat for more still. `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compress images beneath the root, or beneath the given paths.
    Run(RunArgs),
    /// List the images this project has replaced with compressed versions.
    Ledger,
}

#[derive(Args)]
struct RunArgs {
    /// Overwrite images with their compressed version, archiving originals.
    #[arg(long)]
    replace_raw: bool,
    /// Files processed at the same time.
    #[arg(long)]
    concurrency: Option<NonZeroUsize>,
    /// Files or directories, relative to the root.
    paths: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let root = cli.root.clone().unwrap_or_else(|| PathBuf::from("."));
    let root = std::fs::canonicalize(&root).or_raise(|| ErrorKind::Root(root.clone()))?;
    let config = Config::load(&root, cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;

    match cli.command {
        Command::Run(args) => run(&root, config, args).await,
        Command::Ledger => list_ledger(&root).await,
    }
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let level = match verbose {
        0 => "warn,tinyimg=info,tinyimg_pipeline=info",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry().with(fmt::layer().with_target(false).without_time()).with(filter).init();
}

async fn run(root: &Path, mut config: Config, args: RunArgs) -> Result<()> {
    config.replace_raw |= args.replace_raw;
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency.get();
    }

    let cache_dir = config.cache_dir(root);
    let local: CacheHandle = Arc::new(LocalCache::new("local", &cache_dir).or_raise(|| ErrorKind::Cache)?);
    let cache: CacheHandle = if config.cache.read_only { Arc::new(ReadOnlyCache::new(local)) } else { local };
    let compressor = TinyPngClient::with_endpoint(&config.remote.endpoint)
        .or_raise(|| ErrorKind::Remote)?
        .with_timeout(config.remote.timeout());
    let options = Options::new(root)
        .with_replace_raw(config.replace_raw)
        .with_release_source_path(&config.release_source_path)
        .with_ignore(Ignore::components(config.ignore.clone()));
    let archive_dir = options.release_source_base_dir();
    let processor = Processor::new(options, cache, Arc::new(compressor));
    tracing::debug!(cache = %cache_dir.display(), archive = %archive_dir.display(), "Starting");

    let discovery = Discovery::new(root, &config, vec![archive_dir, cache_dir]);
    let walk_failures = Cell::new(0usize);
    let paths = discovery.images(&args.paths).filter_map(|found| {
        let path = match found {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::error!(error = ?e, "Could not search for images");
                walk_failures.set(walk_failures.get() + 1);
                None
            },
        };
        async move { path }
    });

    let mut summary = Summary::default();
    let mut results = std::pin::pin!(process_paths(&processor, paths, config.concurrency));
    while let Some((path, result)) = results.next().await {
        if let Err(e) = &result {
            tracing::error!(path = %path.display(), error = ?e, "Could not process image");
        }
        summary.record(&result);
    }
    println!("{summary}");

    let failed = summary.failed + walk_failures.get();
    if failed > 0 {
        exn::bail!(ErrorKind::Failed(failed));
    }
    Ok(())
}

async fn list_ledger(root: &Path) -> Result<()> {
    let ledger = Ledger::at_root(root);
    ledger.ensure_initialized(false).await.or_raise(|| ErrorKind::Ledger)?;
    for record in ledger.records().await {
        println!("{}  {}  {}", record.original, record.compressed, record.path);
    }
    Ok(())
}
