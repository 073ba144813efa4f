//! Streaming clusterer: each hash joins the first known center within the
//! threshold, or becomes a new center. Only centers are kept in memory, and
//! cluster sizes are not printed; count them in an afterpass.
use anyhow::{Context, Result};
use clap::Parser;
use pdq_mih::cluster::GreedyClusterer;
use pdq_mih::hashio::{self, StreamingRecord};
use pdq_mih::index::MAX_DISTANCE;
use pdq_mih::{Config, QueryMode};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "clusterize256x",
    about = "Streams 256-bit hashes into center-based clusters",
    after_help = "Output lines are clidx=..,hash1=..,hash2=..,is_center=0|1,d=..,<metadata>\n\
                  where hash2 is the center of the cluster."
)]
struct Args {
    /// Hash files to read; stdin when none are given
    files: Vec<PathBuf>,

    /// Distance threshold [default: 31]
    #[arg(short = 'd', long = "distance")]
    distance: Option<usize>,

    /// Use linear search instead of the multi-index
    #[arg(short = 'b', long = "brute-force-query")]
    brute_force: bool,

    /// Log progress every n items
    #[arg(long = "trace", value_name = "N")]
    trace: Option<usize>,

    /// JSON config file; flags override its values
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("could not load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(d) = args.distance {
        config.distance_threshold = d;
    }
    if args.brute_force {
        config.query_mode = QueryMode::BruteForce;
    }
    if let Some(n) = args.trace {
        config.trace_every = n;
    }
    if config.query_mode == QueryMode::Indexed && config.distance_threshold > MAX_DISTANCE {
        warn!(
            d = config.distance_threshold,
            max = MAX_DISTANCE,
            "threshold too large for the multi-index; using brute-force search"
        );
        config.query_mode = QueryMode::BruteForce;
    }

    let mut clusterer = GreedyClusterer::new(config.distance_threshold, config.query_mode)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut count = 0usize;

    hashio::for_each_pair(&args.files, |pair| {
        if config.trace_every > 0 && count % config.trace_every == 0 {
            info!(item = count, centers = clusterer.num_centers(), "clustering");
        }
        count += 1;

        let assignment = clusterer.assign(&pair)?;
        let record = StreamingRecord {
            clidx: assignment.cluster,
            hash1: pair.hash(),
            hash2: &assignment.center,
            is_center: assignment.is_center,
            d: assignment.distance,
            metadata: pair.metadata(),
        };
        writeln!(out, "{}", record).map_err(|source| pdq_mih::Error::Io {
            path: PathBuf::from("-"),
            source,
        })?;
        Ok(())
    })
    .context("could not cluster hashes")?;

    out.flush()?;
    debug!(items = count, centers = clusterer.num_centers(), "done");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
