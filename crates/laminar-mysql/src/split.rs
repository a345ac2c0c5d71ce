//! Row-bounded batch splitting for the write path.

use std::num::NonZeroUsize;

use arrow_array::RecordBatch;

/// Splits `batch` into consecutive chunks of at most `max_rows` rows.
///
/// A batch that already fits is returned as the only element (a cheap
/// `Arc` clone of its columns). Otherwise the result has
/// `ceil(rows / max_rows)` zero-copy slices; every chunk but the last holds
/// exactly `max_rows` rows.
#[must_use]
pub fn split_batch(batch: &RecordBatch, max_rows: NonZeroUsize) -> Vec<RecordBatch> {
    let rows = batch.num_rows();
    let max_rows = max_rows.get();
    if rows <= max_rows {
        return vec![batch.clone()];
    }

    let mut chunks = Vec::with_capacity(rows.div_ceil(max_rows));
    let mut offset = 0;
    while offset < rows {
        let len = max_rows.min(rows - offset);
        chunks.push(batch.slice(offset, len));
        offset += len;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::cast::AsArray;
    use arrow_array::types::UInt32Type;

    use crate::testing::mock_batch;

    fn limit(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_small_batch_is_returned_whole() {
        let batch = mock_batch(3);
        let chunks = split_batch(&batch, limit(10));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], batch);
    }

    #[test]
    fn test_exact_fit_is_one_chunk() {
        let chunks = split_batch(&mock_batch(10), limit(10));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].num_rows(), 10);
    }

    #[test]
    fn test_remainder_goes_to_last_chunk() {
        let chunks = split_batch(&mock_batch(25), limit(10));
        let sizes: Vec<usize> = chunks.iter().map(RecordBatch::num_rows).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
    }

    #[test]
    fn test_chunks_concatenate_to_input() {
        let batch = mock_batch(7);
        let chunks = split_batch(&batch, limit(3));
        assert_eq!(chunks.len(), 3);

        let ids: Vec<u32> = chunks
            .iter()
            .flat_map(|c| c.column(0).as_primitive::<UInt32Type>().values().to_vec())
            .collect();
        assert_eq!(ids, (0..7).collect::<Vec<u32>>());
        for chunk in &chunks {
            assert_eq!(chunk.schema(), batch.schema());
        }
    }

    #[test]
    fn test_single_row_chunks() {
        let chunks = split_batch(&mock_batch(4), limit(1));
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.num_rows() == 1));
    }

    #[test]
    fn test_empty_batch() {
        let chunks = split_batch(&mock_batch(0), limit(5));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].num_rows(), 0);
    }
}
