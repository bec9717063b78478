// ============================================================
// Layer 3 — Time-Major Batch Grid
// ============================================================
// A fixed-shape 2D grid of slots:
//
//   axis 0 — time step   (row)
//   axis 1 — example     (column)
//
// Row t holds token t of every example, which is exactly what a
// step-wise decoder consumes. Columns are the per-example
// sequences, already padded to a common length.
//
//         ex0  ex1  ex2
//   t=0 [  5    9    7 ]
//   t=1 [  3    2  pad ]
//
// Reference: Rust Book §8 (Vectors), §19 (Slices)

use std::ops::Range;

use crate::domain::vocabulary::Slot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeMajor {
    steps: usize,
    width: usize,
    cells: Vec<Slot>,
}

impl TimeMajor {
    /// Stack equal-length columns side by side.
    /// Returns `None` if the columns differ in length.
    pub fn from_columns(columns: &[Vec<Slot>]) -> Option<Self> {
        let width = columns.len();
        let steps = columns.first().map_or(0, Vec::len);
        if columns.iter().any(|c| c.len() != steps) {
            return None;
        }

        let mut cells = Vec::with_capacity(steps * width);
        for t in 0..steps {
            cells.extend(columns.iter().map(|c| c[t]));
        }
        Some(Self { steps, width, cells })
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// All examples at time step `t`.
    pub fn row(&self, t: usize) -> &[Slot] {
        &self.cells[t * self.width..(t + 1) * self.width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Slot]> {
        (0..self.steps).map(move |t| self.row(t))
    }

    /// The full sequence of example `i`.
    pub fn column(&self, i: usize) -> Vec<Slot> {
        (0..self.steps).map(|t| self.cells[t * self.width + i]).collect()
    }

    pub fn columns(&self) -> impl Iterator<Item = Vec<Slot>> + '_ {
        (0..self.width).map(move |i| self.column(i))
    }

    /// A new grid made of the given columns, in the given order.
    pub fn select_columns(&self, indices: &[usize]) -> Self {
        let mut cells = Vec::with_capacity(self.steps * indices.len());
        for row in self.rows() {
            cells.extend(indices.iter().map(|&i| row[i]));
        }
        Self { steps: self.steps, width: indices.len(), cells }
    }

    pub fn column_range(&self, range: Range<usize>) -> Self {
        let indices: Vec<usize> = range.collect();
        self.select_columns(&indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> TimeMajor {
        TimeMajor::from_columns(&[
            vec![Slot::Token(5), Slot::Token(3)],
            vec![Slot::Token(9), Slot::Token(2)],
            vec![Slot::Token(7), Slot::Pad],
        ])
        .unwrap()
    }

    #[test]
    fn test_layout_is_time_major() {
        let g = grid();
        assert_eq!(g.steps(), 2);
        assert_eq!(g.width(), 3);
        assert_eq!(g.row(0), &[Slot::Token(5), Slot::Token(9), Slot::Token(7)]);
        assert_eq!(g.row(1), &[Slot::Token(3), Slot::Token(2), Slot::Pad]);
        assert_eq!(g.column(2), vec![Slot::Token(7), Slot::Pad]);
    }

    #[test]
    fn test_ragged_columns_are_rejected() {
        assert!(TimeMajor::from_columns(&[vec![Slot::Pad], vec![]]).is_none());
    }

    #[test]
    fn test_select_columns_reorders() {
        let g = grid().select_columns(&[2, 0]);
        assert_eq!(g.width(), 2);
        assert_eq!(g.row(1), &[Slot::Pad, Slot::Token(3)]);
    }

    #[test]
    fn test_column_range() {
        let g = grid().column_range(1..3);
        assert_eq!(g.column(0), vec![Slot::Token(9), Slot::Token(2)]);
        assert_eq!(g.width(), 2);
    }

    #[test]
    fn test_empty_grid() {
        let g = TimeMajor::from_columns(&[]).unwrap();
        assert_eq!(g.steps(), 0);
        assert_eq!(g.rows().count(), 0);
    }
}
