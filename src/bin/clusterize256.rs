//! Clusters hashes with metadata among one another, holding all of them in memory.
//!
//! By default clustering is transitive ("snowball"): if h1 is near h2 and h2
//! is near h3, all three share a cluster even when h1 is far from h3. With
//! `--non-snowball`, every hash instead lists all hashes within the
//! threshold, so a hash may be printed many times.
use anyhow::{Context, Result};
use clap::Parser;
use pdq_mih::cluster::{radial, snowball};
use pdq_mih::hashio::{self, RadialRecord, SnowballRecord};
use pdq_mih::index::MAX_DISTANCE;
use pdq_mih::{Config, Index, QueryMode};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "clusterize256",
    about = "Clusters 256-bit hashes within a Hamming-distance threshold",
    after_help = "Input lines are <hash>[,<metadata>], optionally prefixed by \"hash=\".\n\
                  A line without metadata is named idx=<n>."
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

    /// Print a blank line between clusters
    #[arg(short = 's', long = "separate-clusters", alias = "separate_clusters")]
    separate_clusters: bool,

    /// Print each hash once, with transitive clustering (the default)
    #[arg(long, conflicts_with = "non_snowball")]
    snowball: bool,

    /// For each hash, print all other hashes within the threshold
    #[arg(long = "non-snowball")]
    non_snowball: bool,

    /// Log progress every n items
    #[arg(long = "trace", value_name = "N")]
    trace: Option<usize>,

    /// JSON config file; flags override its values
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Echo the input and the index, and log at debug level
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("could not load config {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(d) = self.distance {
            config.distance_threshold = d;
        }
        if self.brute_force {
            config.query_mode = QueryMode::BruteForce;
        }
        if self.separate_clusters {
            config.separate_clusters = true;
        }
        if self.snowball {
            config.snowball = true;
        }
        if self.non_snowball {
            config.snowball = false;
        }
        if let Some(n) = self.trace {
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
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    let config = args.config()?;

    let pairs = hashio::read_pairs_from_paths(&args.files).context("could not load hashes")?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if args.verbose {
        writeln!(out, "ORIGINAL VECTOR OF PAIRS:")?;
        for pair in &pairs {
            writeln!(out, "{},{}", pair.hash(), pair.metadata())?;
        }
        writeln!(out)?;
    }

    let index = Index::from_pairs(pairs)?;

    if args.verbose {
        writeln!(out, "MIH:")?;
        index.dump(&mut out)?;
        writeln!(out)?;
    }

    if config.snowball {
        write_snowball(&mut out, &index, &config)?;
    } else {
        write_radial(&mut out, &index, &config)?;
    }
    out.flush()?;
    Ok(())
}

fn write_snowball<W: Write>(out: &mut W, index: &Index<String>, config: &Config) -> Result<()> {
    let clusters = snowball(
        index,
        config.distance_threshold,
        config.query_mode,
        config.trace_every,
    )?;

    for cluster in &clusters {
        if config.separate_clusters && cluster.index() > 1 {
            writeln!(out)?;
        }
        for &id in cluster.members() {
            let pair = &index.pairs()[id as usize];
            let record = SnowballRecord {
                clidx: cluster.index(),
                clusz: cluster.size(),
                hash: pair.hash(),
                metadata: pair.metadata(),
            };
            writeln!(out, "{}", record)?;
        }
    }
    Ok(())
}

fn write_radial<W: Write>(out: &mut W, index: &Index<String>, config: &Config) -> Result<()> {
    let blocks = radial(
        index,
        config.distance_threshold,
        config.query_mode,
        config.trace_every,
    )?;

    for block in &blocks {
        if config.separate_clusters && block.index > 1 {
            writeln!(out)?;
        }
        let needle = index.pairs()[block.needle as usize].hash();
        for &(id, d) in &block.matches {
            let pair = &index.pairs()[id as usize];
            let record = RadialRecord {
                clidx: block.index,
                clusz: block.matches.len(),
                hash1: needle,
                hash2: pair.hash(),
                d,
                metadata: pair.metadata(),
            };
            writeln!(out, "{}", record)?;
        }
    }
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
