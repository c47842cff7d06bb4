//! Benchmark workloads for the strata arena allocator.
//!
//! Provides deterministic inputs shared by the criterion benches:
//!
//! - [`mixed_sizes`]: allocation sizes with a small-object skew
//! - [`word_corpus`]: pseudo-random lowercase words
//! - [`csv_line`]: one delimited record built from a corpus

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use strata_arena::{Arena, ArenaConfig};

/// Arena sized for the benches: 1MB commit chunks where virtual memory is
/// available, a 64MB fixed buffer elsewhere.
pub fn bench_arena() -> Arena {
    Arena::from_config(&ArenaConfig {
        buffer_bytes: 64 << 20,
        ..ArenaConfig::with_commit_pages(256)
    })
}

/// Deterministic LCG step.
fn next(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state >> 33
}

/// Generate `n` allocation sizes in `1..=max`.
///
/// Three quarters of the sizes are at most `max / 16`, mimicking the
/// small-object skew of parser and compiler workloads.
pub fn mixed_sizes(n: usize, max: usize, seed: u64) -> Vec<usize> {
    let mut state = seed;
    let small = (max / 16).max(1);
    (0..n)
        .map(|_| {
            let r = next(&mut state) as usize;
            if r % 4 == 0 {
                1 + r / 4 % max
            } else {
                1 + r / 4 % small
            }
        })
        .collect()
}

/// Generate `n` lowercase words of 2 to 9 letters.
pub fn word_corpus(n: usize, seed: u64) -> Vec<String> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            let len = 2 + next(&mut state) as usize % 8;
            (0..len)
                .map(|_| char::from(b'a' + (next(&mut state) % 26) as u8))
                .collect()
        })
        .collect()
}

/// Join `words` with `sep`.
pub fn csv_line(words: &[String], sep: &str) -> String {
    words.join(sep)
}
