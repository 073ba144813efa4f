//! Inspection and manipulation of 256-bit hash lists.
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pdq_mih::{hashio, ls, Hash256, HashAndMetadata};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "hashtool256",
    about = "Operations on 256-bit hash lists",
    after_help = "Hash files hold one hash per line; text after a comma is ignored.\n\
                  Stdin is read when a verb takes files and none are given."
)]
struct Args {
    #[command(subcommand)]
    verb: Verb,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Verb {
    /// Print each hash with its number of set bits
    Norms { files: Vec<PathBuf> },
    /// Print each hash with the set-bit count of each 16-bit lane, lane 0 first
    Slotnorms { files: Vec<PathBuf> },
    /// Print each hash with its distance to the previous one
    Deltas { files: Vec<PathBuf> },
    /// Print the XOR of each adjacent pair of hashes
    Axors { files: Vec<PathBuf> },
    /// Print the XOR of the first hash with each later one
    Fxors { files: Vec<PathBuf> },
    /// Print the distance matrix of one list with itself, or of two lists
    Matrix {
        #[arg(num_args = 0..=2)]
        files: Vec<PathBuf>,
    },
    /// Same as matrix, one labelled line per cell
    Cij {
        #[arg(num_args = 0..=2)]
        files: Vec<PathBuf>,
    },
    /// Print the distance of the i-th hashes of two lists
    PairwiseDistances { first: PathBuf, second: PathBuf },
    /// Print each hash as a 16x16 bit matrix
    Bits { files: Vec<PathBuf> },
    /// Print each hash as 16 hex words
    Words { files: Vec<PathBuf> },
    /// Flip that many randomly chosen bits of each hash
    Fuzz {
        num_error_bits: usize,
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match args.verb {
        Verb::Norms { files } => {
            for hash in load(&files)? {
                writeln!(out, "{} {}", hash, hash.hamming_norm())?;
            }
        }
        Verb::Slotnorms { files } => {
            for hash in load(&files)? {
                write!(out, "{}", hash)?;
                for norm in hash.lane_norms() {
                    write!(out, " {:2}", norm)?;
                }
                writeln!(out)?;
            }
        }
        Verb::Deltas { files } => {
            let hashes = load(&files)?;
            for (i, hash) in hashes.iter().enumerate() {
                if i == 0 {
                    writeln!(out, "{}", hash)?;
                } else {
                    writeln!(out, "{} {}", hash, hash.hamming_distance(&hashes[i - 1]))?;
                }
            }
        }
        Verb::Axors { files } => {
            let hashes = load(&files)?;
            for pair in hashes.windows(2) {
                writeln!(out, "{}", pair[0] ^ pair[1])?;
            }
        }
        Verb::Fxors { files } => {
            let hashes = load(&files)?;
            if let Some((first, rest)) = hashes.split_first() {
                for hash in rest {
                    writeln!(out, "{}", *first ^ *hash)?;
                }
            }
        }
        Verb::Matrix { files } => {
            let (rows, cols) = load_matrix_operands(&files)?;
            for a in &rows {
                for (_, d) in ls::exhaustive_search(&cols, a) {
                    write!(out, " {:3}", d)?;
                }
                writeln!(out)?;
            }
        }
        Verb::Cij { files } => {
            let (rows, cols) = load_matrix_operands(&files)?;
            for (i, a) in rows.iter().enumerate() {
                for (j, d) in ls::exhaustive_search(&cols, a) {
                    let b = cols[j as usize].hash();
                    writeln!(out, "ci={},cj={},i={},j={},d={}", a, b, i, j, d)?;
                }
            }
        }
        Verb::PairwiseDistances { first, second } => {
            let a = load(&[first])?;
            let b = load(&[second])?;
            for (x, y) in a.iter().zip(b.iter()) {
                writeln!(out, "{:3}", x.hamming_distance(y))?;
            }
        }
        Verb::Bits { files } => {
            for hash in load(&files)? {
                write!(out, "{}", hash.bit_matrix())?;
                writeln!(out)?;
            }
        }
        Verb::Words { files } => {
            for hash in load(&files)? {
                writeln!(out, "{}", hash.words())?;
            }
        }
        Verb::Fuzz {
            num_error_bits,
            files,
        } => {
            let mut rng = rand::thread_rng();
            for hash in load(&files)? {
                writeln!(out, "{}", hash.fuzz(num_error_bits, &mut rng))?;
            }
        }
    }

    out.flush()?;
    Ok(())
}

fn load(files: &[PathBuf]) -> Result<Vec<Hash256>> {
    Ok(load_pairs(files)?.into_iter().map(|pair| *pair.hash()).collect())
}

fn load_pairs(files: &[PathBuf]) -> Result<Vec<HashAndMetadata<String>>> {
    hashio::read_pairs_from_paths(files).context("could not load hashes")
}

/// One list against itself, or the first list against the second.
/// Row hashes come first; columns keep their pairs for the linear scan.
fn load_matrix_operands(files: &[PathBuf]) -> Result<(Vec<Hash256>, Vec<HashAndMetadata<String>>)> {
    let (rows, cols) = match files {
        [] | [_] => {
            let pairs = load_pairs(files)?;
            (pairs.clone(), pairs)
        }
        [first, second] => (
            load_pairs(std::slice::from_ref(first))?,
            load_pairs(std::slice::from_ref(second))?,
        ),
        _ => bail!("matrix takes at most two files"),
    };
    Ok((rows.into_iter().map(|pair| *pair.hash()).collect(), cols))
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
