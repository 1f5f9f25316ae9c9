use crate::error::ValidationError;

const INITIAL_STRIDE: usize = 8;

/// A growable, symmetric, square matrix of pairwise page scores.
///
/// Rows are stored in a single flat buffer with a fixed row stride, so adding
/// a page only reallocates when the stride is exhausted. The diagonal is
/// always zero.
///
/// # Example
///
/// ```
/// use session_clustering::SimilarityMatrix;
///
/// let mut matrix = SimilarityMatrix::new();
/// matrix.add_page(&[]).unwrap();
/// matrix.add_page(&[0.5]).unwrap();
/// assert_eq!(matrix.get(0, 1), 0.5);
/// assert_eq!(matrix.get(1, 1), 0.0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SimilarityMatrix {
    /// Row-major storage, `stride * stride` cells.
    data: Vec<f64>,
    /// Allocated row length.
    stride: usize,
    /// Number of tracked pages.
    dimension: usize,
}

impl SimilarityMatrix {
    pub fn new() -> SimilarityMatrix {
        SimilarityMatrix::default()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.dimension == 0
    }

    /// Returns the score between pages `row` and `column`.
    ///
    /// # Panics
    ///
    /// Panics if either index is not below the dimension.
    pub fn get(&self, row: usize, column: usize) -> f64 {
        assert!(row < self.dimension && column < self.dimension);
        self.data[row * self.stride + column]
    }

    /// Returns the scores of page `row` against every tracked page.
    ///
    /// # Panics
    ///
    /// Panics if `row` is not below the dimension.
    pub fn row(&self, row: usize) -> &[f64] {
        assert!(row < self.dimension);
        let start = row * self.stride;
        &self.data[start..start + self.dimension]
    }

    /// Copies the matrix into a dense `dimension * dimension` buffer.
    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = Vec::with_capacity(self.dimension * self.dimension);
        for row in 0..self.dimension {
            dense.extend_from_slice(self.row(row));
        }
        dense
    }

    /// Appends a page whose scores against the existing pages are `similarities`.
    pub fn add_page(&mut self, similarities: &[f64]) -> Result<(), ValidationError> {
        self.insert_page(self.dimension, similarities)
    }

    /// Inserts a page at `index`, shifting every later page up by one.
    ///
    /// `similarities` holds the scores against the existing pages in their
    /// current order. This is the inverse of [`SimilarityMatrix::remove_page`].
    pub fn insert_page(
        &mut self,
        index: usize,
        similarities: &[f64],
    ) -> Result<(), ValidationError> {
        let n = self.dimension;
        if similarities.len() != n {
            return Err(ValidationError::DimensionMismatch {
                expected: n,
                actual: similarities.len(),
            });
        }
        if index > n {
            return Err(ValidationError::IndexOutOfRange {
                index,
                dimension: n,
            });
        }

        self.reserve_one();
        let s = self.stride;

        for row in (index..n).rev() {
            self.data.copy_within(row * s..row * s + n, (row + 1) * s);
        }
        for row in 0..=n {
            if row != index {
                let base = row * s;
                self.data.copy_within(base + index..base + n, base + index + 1);
            }
        }

        for (old_column, &value) in similarities.iter().enumerate() {
            let column = if old_column < index {
                old_column
            } else {
                old_column + 1
            };
            self.data[index * s + column] = value;
            self.data[column * s + index] = value;
        }
        self.data[index * s + index] = 0.0;
        self.dimension += 1;
        Ok(())
    }

    /// Deletes row and column `index`, returning the removed scores in the
    /// order of the remaining pages.
    pub fn remove_page(&mut self, index: usize) -> Result<Vec<f64>, ValidationError> {
        let n = self.dimension;
        if index >= n {
            return Err(ValidationError::IndexOutOfRange {
                index,
                dimension: n,
            });
        }

        let s = self.stride;
        let removed: Vec<f64> = (0..n)
            .filter(|&column| column != index)
            .map(|column| self.data[index * s + column])
            .collect();

        for row in 0..n {
            if row != index {
                let base = row * s;
                self.data.copy_within(base + index + 1..base + n, base + index);
            }
        }
        for row in index + 1..n {
            self.data.copy_within(row * s..row * s + n - 1, (row - 1) * s);
        }

        // Clear the vacated last row and column.
        let last = n - 1;
        for i in 0..n {
            self.data[last * s + i] = 0.0;
            self.data[i * s + last] = 0.0;
        }
        self.dimension = last;
        Ok(removed)
    }

    fn reserve_one(&mut self) {
        if self.dimension < self.stride {
            return;
        }
        let new_stride = (self.stride * 2).max(INITIAL_STRIDE);
        let mut data = vec![0.0; new_stride * new_stride];
        for row in 0..self.dimension {
            let old = &self.data[row * self.stride..row * self.stride + self.dimension];
            data[row * new_stride..row * new_stride + self.dimension].copy_from_slice(old);
        }
        self.data = data;
        self.stride = new_stride;
    }
}

impl PartialEq for SimilarityMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.dimension == other.dimension
            && (0..self.dimension).all(|row| self.row(row) == other.row(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_matrix(rng: &mut StdRng, dimension: usize) -> SimilarityMatrix {
        let mut matrix = SimilarityMatrix::new();
        for n in 0..dimension {
            let row: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1.0)).collect();
            matrix.add_page(&row).unwrap();
        }
        matrix
    }

    fn assert_symmetric(matrix: &SimilarityMatrix) {
        for i in 0..matrix.dimension() {
            assert_eq!(matrix.get(i, i), 0.0);
            for j in 0..matrix.dimension() {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
            }
        }
    }

    #[test]
    fn add_page_appends_row_and_column() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in 1..20 {
            let mut matrix = random_matrix(&mut rng, n);
            let before = matrix.clone();
            let row: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1.0)).collect();

            matrix.add_page(&row).unwrap();

            assert_eq!(matrix.dimension(), n + 1);
            assert_symmetric(&matrix);
            assert_eq!(&matrix.row(n)[..n], row.as_slice());
            assert_eq!(matrix.get(n, n), 0.0);
            for i in 0..n {
                assert_eq!(&matrix.row(i)[..n], before.row(i));
            }
        }
    }

    #[test]
    fn add_page_with_wrong_length_leaves_matrix_unchanged() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut matrix = random_matrix(&mut rng, 5);
        let before = matrix.clone();

        for len in [0, 3, 4, 6, 12] {
            let err = matrix.add_page(&vec![0.3; len]).unwrap_err();
            assert_eq!(
                err,
                ValidationError::DimensionMismatch {
                    expected: 5,
                    actual: len
                }
            );
            assert_eq!(matrix.to_dense(), before.to_dense());
        }
    }

    #[test]
    fn remove_page_deletes_row_and_column() {
        let mut rng = StdRng::seed_from_u64(3);
        for n in 1..12 {
            for index in 0..n {
                let original = random_matrix(&mut rng, n);
                let mut matrix = original.clone();

                matrix.remove_page(index).unwrap();

                assert_eq!(matrix.dimension(), n - 1);
                let kept: Vec<usize> = (0..n).filter(|&i| i != index).collect();
                for (i, &oi) in kept.iter().enumerate() {
                    for (j, &oj) in kept.iter().enumerate() {
                        assert_eq!(matrix.get(i, j), original.get(oi, oj));
                    }
                }
            }
        }
    }

    #[test]
    fn remove_page_out_of_range_fails() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut matrix = random_matrix(&mut rng, 4);
        let before = matrix.clone();

        let err = matrix.remove_page(4).unwrap_err();

        assert_eq!(
            err,
            ValidationError::IndexOutOfRange {
                index: 4,
                dimension: 4
            }
        );
        assert_eq!(matrix, before);
        assert!(SimilarityMatrix::new().remove_page(0).is_err());
    }

    #[test]
    fn insert_page_restores_removed_page() {
        let mut rng = StdRng::seed_from_u64(13);
        let original = random_matrix(&mut rng, 9);
        for index in 0..9 {
            let mut matrix = original.clone();
            let removed = matrix.remove_page(index).unwrap();
            matrix.insert_page(index, &removed).unwrap();
            assert_eq!(matrix, original);
        }
    }

    #[test]
    #[should_panic]
    fn row_past_dimension_panics() {
        let mut rng = StdRng::seed_from_u64(17);
        let matrix = random_matrix(&mut rng, 3);
        let _ = matrix.row(3);
    }

    #[test]
    fn growth_past_initial_stride_keeps_values() {
        let mut matrix = SimilarityMatrix::new();
        for n in 0..40 {
            let row: Vec<f64> = (0..n).map(|j| (n * 100 + j) as f64).collect();
            matrix.add_page(&row).unwrap();
        }
        assert_eq!(matrix.dimension(), 40);
        assert_eq!(matrix.get(39, 2), 3902.0);
        assert_eq!(matrix.get(2, 39), 3902.0);
        assert_symmetric(&matrix);
    }
}
