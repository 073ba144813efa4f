//! Computes PDQ hashes of image files.
use anyhow::{bail, Context, Result};
use clap::Parser;
use pdq_mih::{Dihedral, Hash256, HashingStats, HashesAndQuality, PdqHasher};
use rayon::prelude::*;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const XFORM_NAMES: [&str; 8] = [
    "orig", "rot90", "rot180", "rot270", "flipx", "flipy", "flipp", "flipm",
];

#[derive(Parser, Debug)]
#[command(
    name = "pdq-photo-hasher",
    about = "Computes PDQ hashes of image files",
    after_help = "Default output is <hash>,<quality>,<filename> per image."
)]
struct Args {
    /// Image files to hash
    files: Vec<PathBuf>,

    /// Take filenames from stdin, one per line; no filenames may be given
    #[arg(short = 'i', long = "files-on-stdin", conflicts_with = "files")]
    files_on_stdin: bool,

    /// Print norm, delta, and timings as well
    #[arg(short = 'd', long = "details")]
    details: bool,

    /// Print the original-orientation hash only (the default)
    #[arg(long = "pdq", conflicts_with_all = ["pdqdih", "pdqdih_across"])]
    pdq: bool,

    /// Print all 8 dihedral-transform hashes, one per line
    #[arg(long = "pdqdih", conflicts_with = "pdqdih_across")]
    pdqdih: bool,

    /// Print all 8 dihedral-transform hashes on one line
    #[arg(long = "pdqdih-across")]
    pdqdih_across: bool,

    /// Leave timings out of detailed output
    #[arg(long = "no-timings")]
    no_timings: bool,

    /// Continue past unreadable images, still exiting with failure afterward
    #[arg(short = 'k', long = "keep-going")]
    keep_going: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let files = if args.files_on_stdin {
        let mut files = Vec::new();
        for line in io::stdin().lock().lines() {
            let line = line.context("could not read filenames from stdin")?;
            if !line.is_empty() {
                files.push(PathBuf::from(line));
            }
        }
        files
    } else {
        args.files.clone()
    };
    if files.is_empty() {
        bail!("no image files given");
    }

    let flags = if !args.pdq && (args.pdqdih || args.pdqdih_across) {
        Dihedral::ALL
    } else {
        Dihedral::ORIGINAL
    };

    let hasher = PdqHasher::new();
    let results: Vec<_> = files
        .par_iter()
        .map(|path| hasher.dihedral_file(path, flags))
        .collect();
    info!(files = files.len(), "hashed");

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut prev: Option<Hash256> = None;
    let mut num_errors = 0usize;

    for (path, result) in files.iter().zip(results) {
        let (hashes, stats) = match result {
            Ok(found) => found,
            Err(e) if args.keep_going => {
                error!(path = %path.display(), "{}", e);
                num_errors += 1;
                continue;
            }
            Err(e) => {
                out.flush()?;
                return Err(e).with_context(|| format!("could not hash {}", path.display()));
            }
        };

        let filename = path.display();
        if flags == Dihedral::ORIGINAL {
            write_plain(&mut out, &args, &hashes, &stats, prev, &filename)?;
        } else if args.pdqdih_across {
            write_across(&mut out, &args, &hashes, &stats, &filename)?;
        } else {
            write_dihedral(&mut out, &args, &hashes, &stats, &filename)?;
        }
        prev = hashes.hash;
    }
    out.flush()?;

    if num_errors > 0 {
        bail!("{} of {} images could not be hashed", num_errors, files.len());
    }
    Ok(())
}

fn write_plain<W: Write>(
    out: &mut W,
    args: &Args,
    hashes: &HashesAndQuality,
    stats: &HashingStats,
    prev: Option<Hash256>,
    filename: &impl std::fmt::Display,
) -> Result<()> {
    let hash = hashes.hash.unwrap_or_default();
    if !args.details {
        writeln!(out, "{},{},{}", hash, hashes.quality, filename)?;
        return Ok(());
    }

    let delta = prev.map_or(0, |p| hash.hamming_distance(&p));
    write!(
        out,
        "hash={},norm={},delta={},quality={}",
        hash,
        hash.hamming_norm(),
        delta,
        hashes.quality
    )?;
    write_timings(out, args, stats)?;
    writeln!(out, ",filename={}", filename)?;
    Ok(())
}

fn write_across<W: Write>(
    out: &mut W,
    args: &Args,
    hashes: &HashesAndQuality,
    stats: &HashingStats,
    filename: &impl std::fmt::Display,
) -> Result<()> {
    let all = hashes.hashes();
    if !args.details {
        for hash in &all {
            write!(out, "{},", hash)?;
        }
        writeln!(out, "{},{}", hashes.quality, filename)?;
        return Ok(());
    }

    write!(out, "hash={},quality={}", all[0], hashes.quality)?;
    write_timings(out, args, stats)?;
    for (name, hash) in XFORM_NAMES.iter().zip(&all) {
        write!(out, ",{}={}", name, hash)?;
    }
    writeln!(out, ",filename={}", filename)?;
    Ok(())
}

fn write_dihedral<W: Write>(
    out: &mut W,
    args: &Args,
    hashes: &HashesAndQuality,
    stats: &HashingStats,
    filename: &impl std::fmt::Display,
) -> Result<()> {
    let all = hashes.hashes();
    if !args.details {
        for hash in &all {
            writeln!(out, "{},{},{}", hash, hashes.quality, filename)?;
        }
        return Ok(());
    }

    write!(out, "hash={},quality={}", all[0], hashes.quality)?;
    write_timings(out, args, stats)?;
    writeln!(out, ",filename={}", filename)?;
    for (name, hash) in XFORM_NAMES.iter().zip(&all) {
        writeln!(out, "hash={},xform={},filename={}", hash, name, filename)?;
    }
    Ok(())
}

fn write_timings<W: Write>(out: &mut W, args: &Args, stats: &HashingStats) -> Result<()> {
    if !args.no_timings {
        write!(
            out,
            ",dims={},readSeconds={:.6},hashSeconds={:.6}",
            stats.image_height_times_width, stats.read_seconds, stats.hash_seconds
        )?;
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
