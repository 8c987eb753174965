//! Named, ordered collections of columns.

use std::ops::Range;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use super::column::Column;

/// A dataset: an ordered list of named columns of equal length.
///
/// Columns are shared via `Arc`, so cloning a frame is a cheap defensive
/// copy: adaptation can restructure the clone in place while every column
/// that existed in the original stays owned by (and alive through) the
/// original. Columns synthesized during adaptation live only as long as the
/// adapted clone.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    names: Vec<String>,
    columns: Vec<Arc<Column>>,
}

impl Frame {
    pub fn new(names: Vec<String>, columns: Vec<Arc<Column>>) -> Self {
        assert_eq!(names.len(), columns.len(), "one name per column");
        if let Some(first) = columns.first() {
            assert!(
                columns.iter().all(|c| c.len() == first.len()),
                "columns must have equal length"
            );
        }
        Self { names, columns }
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.len())
    }

    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn columns(&self) -> &[Arc<Column>] {
        &self.columns
    }

    /// Column lookup by name.
    pub fn col(&self, name: &str) -> Option<&Arc<Column>> {
        self.find(name).map(|i| &self.columns[i])
    }

    /// Position of a column by name.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Column at a position.
    pub fn col_at(&self, idx: usize) -> &Arc<Column> {
        &self.columns[idx]
    }

    /// Last column; for supervised training frames this is the response.
    pub fn last_col(&self) -> Option<&Arc<Column>> {
        self.columns.last()
    }

    /// Per-column categorical domains, `None` for numeric columns.
    pub fn domains(&self) -> Vec<Option<Vec<String>>> {
        self.columns
            .iter()
            .map(|c| c.domain().map(|d| d.to_vec()))
            .collect()
    }

    /// Replace this frame's column list in place.
    ///
    /// Used by adaptation to reorder columns to a trained schema once every
    /// trained column has resolved.
    pub fn restructure(&mut self, names: Vec<String>, columns: Vec<Arc<Column>>) {
        assert_eq!(names.len(), columns.len(), "one name per column");
        self.names = names;
        self.columns = columns;
    }

    /// Replace a single column in place.
    pub fn replace(&mut self, idx: usize, column: Arc<Column>) {
        self.columns[idx] = column;
    }

    /// True when `column` is one of this frame's columns (same allocation).
    pub fn owns(&self, column: &Arc<Column>) -> bool {
        self.columns.iter().any(|c| Arc::ptr_eq(c, column))
    }

    /// Split rows into `n` contiguous partition ranges.
    ///
    /// Every row lands in exactly one range. Ranges may be empty when there
    /// are more partitions than rows, which the scorer's reduce tolerates.
    pub fn partition_ranges(&self, n: usize) -> Vec<Range<usize>> {
        let n = n.max(1);
        let rows = self.num_rows();
        let base = rows / n;
        let extra = rows % n;
        let mut ranges = Vec::with_capacity(n);
        let mut start = 0;
        for i in 0..n {
            let len = base + usize::from(i < extra);
            ranges.push(start..start + len);
            start += len;
        }
        ranges
    }

    /// Content-based checksum folded over all columns and names.
    pub fn checksum(&self) -> u64 {
        let mut xs: u64 = 0;
        for (name, col) in self.names.iter().zip(&self.columns) {
            let mut hasher = Sha256::new();
            hasher.update(name.as_bytes());
            hasher.update(col.checksum().to_le_bytes());
            let digest = hasher.finalize();
            xs = xs.rotate_left(7) ^ u64::from_le_bytes(digest[..8].try_into().unwrap());
        }
        xs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_frame() -> Frame {
        Frame::new(
            vec!["a".into(), "b".into()],
            vec![
                Arc::new(Column::numeric(vec![1.0, 2.0, 3.0])),
                Arc::new(Column::numeric(vec![4.0, 5.0, 6.0])),
            ],
        )
    }

    #[test]
    fn test_partition_ranges_cover_all_rows() {
        let fr = small_frame();
        for n in 1..=5 {
            let ranges = fr.partition_ranges(n);
            assert_eq!(ranges.len(), n);
            let total: usize = ranges.iter().map(|r| r.len()).sum();
            assert_eq!(total, 3);
            assert_eq!(ranges.first().unwrap().start, 0);
            assert_eq!(ranges.last().unwrap().end, 3);
        }
    }

    #[test]
    fn test_clone_shares_columns() {
        let fr = small_frame();
        let copy = fr.clone();
        assert!(fr.owns(copy.col("a").unwrap()));
    }

    #[test]
    fn test_checksum_sensitive_to_column_order() {
        let fr = small_frame();
        let mut swapped = fr.clone();
        swapped.restructure(
            vec!["b".into(), "a".into()],
            vec![fr.col("b").unwrap().clone(), fr.col("a").unwrap().clone()],
        );
        assert_ne!(fr.checksum(), swapped.checksum());
    }
}
