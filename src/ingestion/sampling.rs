//! Seeded row sampling
//!
//! Uniform sampling without replacement. The generator is `StdRng` seeded
//! with [`SAMPLE_SEED`], so the same row count and sample size always pick
//! the same rows in the same order.

use crate::ingestion::row_set::RowSet;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use tracing::info;

pub const SAMPLE_SEED: u64 = 42;

/// Picks `sample_size` distinct row indices out of `total_rows`, in draw order.
///
/// Returns `None` when no sampling is needed.
pub fn sample_indices(total_rows: usize, sample_size: Option<usize>) -> Option<Vec<usize>> {
    let sample_size = match sample_size {
        Some(n) if n > 0 && n < total_rows => n,
        _ => return None,
    };

    let mut rng = StdRng::seed_from_u64(SAMPLE_SEED);
    Some(index::sample(&mut rng, total_rows, sample_size).into_vec())
}

/// Applies [`sample_indices`] to a row set. Rows are returned untouched, in
/// source order, when the sample would cover the whole set.
pub fn sample_rows(rows: RowSet, sample_size: Option<usize>) -> RowSet {
    match sample_indices(rows.row_count(), sample_size) {
        Some(indices) => {
            info!(
                sampled = indices.len(),
                total = rows.row_count(),
                seed = SAMPLE_SEED,
                "sampling rows"
            );
            rows.select(&indices)
        }
        None => rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_no_sampling_when_not_needed() {
        assert_eq!(sample_indices(10, None), None);
        assert_eq!(sample_indices(10, Some(0)), None);
        assert_eq!(sample_indices(10, Some(10)), None);
        assert_eq!(sample_indices(10, Some(25)), None);
    }

    #[test]
    fn test_sample_is_exact_and_distinct() {
        let indices = sample_indices(1000, Some(100)).unwrap();
        assert_eq!(indices.len(), 100);
        let unique: HashSet<_> = indices.iter().collect();
        assert_eq!(unique.len(), 100);
        assert!(indices.iter().all(|&i| i < 1000));
    }

    #[test]
    fn test_sample_is_reproducible() {
        assert_eq!(sample_indices(5000, Some(37)), sample_indices(5000, Some(37)));
    }
}
