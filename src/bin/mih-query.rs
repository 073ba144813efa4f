//! Looks up each needle hash in a haystack of hashes with metadata.
use anyhow::{Context, Result};
use clap::Parser;
use pdq_mih::config::DEFAULT_DISTANCE_THRESHOLD;
use pdq_mih::hashio::{self, MatchRecord};
use pdq_mih::index::MAX_DISTANCE;
use pdq_mih::{Index, QueryMode};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "mih-query",
    about = "Finds haystack hashes within a Hamming-distance threshold of each needle"
)]
struct Args {
    /// File of needle hashes
    needles: PathBuf,

    /// File of haystack hashes with metadata
    haystack: PathBuf,

    /// Distance threshold
    #[arg(short = 'd', long = "distance", default_value_t = DEFAULT_DISTANCE_THRESHOLD)]
    distance: usize,

    /// Use linear search instead of the multi-index
    #[arg(short = 'b', long = "brute-force-query")]
    brute_force: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let needles = hashio::read_pairs_from_paths(&[&args.needles])
        .with_context(|| format!("could not load needles {}", args.needles.display()))?;
    let haystack = hashio::read_pairs_from_paths(&[&args.haystack])
        .with_context(|| format!("could not load haystack {}", args.haystack.display()))?;

    let mut mode = if args.brute_force {
        QueryMode::BruteForce
    } else {
        QueryMode::Indexed
    };
    if mode == QueryMode::Indexed && args.distance > MAX_DISTANCE {
        warn!(
            d = args.distance,
            max = MAX_DISTANCE,
            "threshold too large for the multi-index; using brute-force search"
        );
        mode = QueryMode::BruteForce;
    }

    let index = Index::from_pairs(haystack)?;
    debug!(needles = needles.len(), haystack = index.len(), "loaded");

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut answers = Vec::new();

    for (i, needle) in needles.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "needle={}", needle.hash())?;

        answers.clear();
        match mode {
            QueryMode::Indexed => index.query_all_ids_with_buf(needle.hash(), args.distance, &mut answers)?,
            QueryMode::BruteForce => {
                pdq_mih::ls::range_search_with_buf(index.pairs(), needle.hash(), args.distance, &mut answers)
            }
        }

        for &id in &answers {
            let pair = &index.pairs()[id as usize];
            let record = MatchRecord {
                d: pair.hash().hamming_distance(needle.hash()),
                hash: pair.hash(),
                metadata: pair.metadata(),
            };
            writeln!(out, "{}", record)?;
        }
    }
    out.flush()?;
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
