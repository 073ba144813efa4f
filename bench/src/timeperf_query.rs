//! Provides the benchmark of range queries for MIH and LinearSearch algorithms.
use pdq_mih::{Hash256, HashAndMetadata, Index};
use rand::{thread_rng, Rng};
use std::time;

const SIZES: [usize; 3] = [10_000, 100_000, 1_000_000];
const THRESHOLDS: [usize; 4] = [15, 31, 47, 63];
const NUM_QUERIES: usize = 100;

fn main() {
    #[cfg(debug_assertions)]
    println!("Debugging enabled");

    let pairs = gen_random_pairs(SIZES[SIZES.len() - 1]);
    let needles = gen_needles(&pairs, NUM_QUERIES);
    perf_test(&pairs, &needles);
}

fn perf_test(pairs: &[HashAndMetadata<usize>], needles: &[Hash256]) {
    println!("*** perf_test<Hash256> ***");

    for &size in &SIZES {
        println!("-- N={} --", size);

        let ins = time::Instant::now();
        let index = Index::from_pairs(pairs[0..size].to_vec()).unwrap();
        let elapsed_sec = ins.elapsed().as_secs_f64();
        println!("Constr time: {} sec", elapsed_sec);

        for &d in &THRESHOLDS {
            let ins = time::Instant::now();
            let mut num_answers = 0;
            for needle in needles {
                num_answers += index.query_all_ids(needle, d).unwrap().len();
            }
            let elapsed_ms = ins.elapsed().as_millis() as f64;
            println!(
                "MIH all (d={}):\t{} ms/query\t{} answers/query",
                d,
                elapsed_ms / needles.len() as f64,
                num_answers as f64 / needles.len() as f64
            );

            let ins = time::Instant::now();
            for needle in needles {
                index.query_any(needle, d).unwrap();
            }
            let elapsed_ms = ins.elapsed().as_millis() as f64;
            println!(
                "MIH any (d={}):\t{} ms/query",
                d,
                elapsed_ms / needles.len() as f64
            );

            let ins = time::Instant::now();
            for needle in needles {
                let answers = pdq_mih::ls::range_search(index.pairs(), needle, d);
                assert!(answers.len() <= size);
            }
            let elapsed_ms = ins.elapsed().as_millis() as f64;
            println!(
                "LinearSearch (d={}):\t{} ms/query",
                d,
                elapsed_ms / needles.len() as f64
            );
        }
    }
}

pub fn gen_random_pairs(size: usize) -> Vec<HashAndMetadata<usize>> {
    let mut rng = thread_rng();
    let mut pairs = Vec::with_capacity(size);
    for i in 0..size {
        pairs.push(HashAndMetadata::new(Hash256::random(&mut rng), i));
    }
    pairs
}

/// Needles near stored hashes of the smallest size, so every run has hits.
pub fn gen_needles(pairs: &[HashAndMetadata<usize>], num: usize) -> Vec<Hash256> {
    let mut rng = thread_rng();
    (0..num)
        .map(|_| {
            let base = pairs[rng.gen_range(0..SIZES[0])].hash();
            base.fuzz(rng.gen_range(0..32), &mut rng)
        })
        .collect()
}
