//! Sparse matrices in coordinate (COO) format, assembled from triplets.

use num_traits::Float;

/// A sparse matrix stored as sorted coordinate triplets.
///
/// Built from `(row, col, value)` triplets; duplicate coordinates are summed
/// during assembly, so accumulation loops can emit overlapping entries and
/// let construction consolidate them.
#[derive(Clone, Debug)]
pub struct CooMatrix<F> {
    nrows: usize,
    ncols: usize,
    /// Row indices, sorted by `(row, col)`.
    rows: Vec<usize>,
    /// Column indices, aligned with `rows`.
    cols: Vec<usize>,
    /// Values, aligned with `rows`.
    vals: Vec<F>,
}

impl<F: Float> CooMatrix<F> {
    /// Assemble from triplets, summing duplicate `(row, col)` entries.
    ///
    /// # Panics
    ///
    /// Panics if a triplet lies outside the matrix dimensions.
    pub fn from_triplets(nrows: usize, ncols: usize, triplets: &[(usize, usize, F)]) -> Self {
        let mut sorted: Vec<(usize, usize, F)> = triplets.to_vec();
        for &(r, c, _) in &sorted {
            assert!(
                r < nrows && c < ncols,
                "triplet ({}, {}) outside a {}x{} matrix",
                r,
                c,
                nrows,
                ncols
            );
        }
        sorted.sort_by_key(|&(r, c, _)| (r, c));

        let mut rows = Vec::with_capacity(sorted.len());
        let mut cols = Vec::with_capacity(sorted.len());
        let mut vals: Vec<F> = Vec::with_capacity(sorted.len());
        for (r, c, v) in sorted {
            if let (Some(&lr), Some(&lc)) = (rows.last(), cols.last()) {
                if lr == r && lc == c {
                    let last = vals.last_mut().expect("vals aligned with rows");
                    *last = *last + v;
                    continue;
                }
            }
            rows.push(r);
            cols.push(c);
            vals.push(v);
        }

        CooMatrix {
            nrows,
            ncols,
            rows,
            cols,
            vals,
        }
    }

    /// Number of rows.
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of stored entries (after duplicate consolidation).
    pub fn nnz(&self) -> usize {
        self.vals.len()
    }

    /// Whether the matrix stores no entries.
    pub fn is_empty(&self) -> bool {
        self.vals.is_empty()
    }

    /// Entry at `(i, j)`, zero if not stored.
    pub fn get(&self, i: usize, j: usize) -> F {
        match self
            .rows
            .iter()
            .zip(self.cols.iter())
            .position(|(&r, &c)| (r, c) == (i, j))
        {
            Some(k) => self.vals[k],
            None => F::zero(),
        }
    }

    /// Iterate stored `(row, col, value)` entries in `(row, col)` order.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, F)> + '_ {
        self.rows
            .iter()
            .zip(self.cols.iter())
            .zip(self.vals.iter())
            .map(|((&r, &c), &v)| (r, c, v))
    }

    /// Dense row-major copy.
    pub fn to_dense(&self) -> Vec<Vec<F>> {
        let mut dense = vec![vec![F::zero(); self.ncols]; self.nrows];
        for (r, c, v) in self.triplets() {
            dense[r][c] = v;
        }
        dense
    }

    /// Matrix-vector product `A·x` over the stored entries.
    pub fn matvec(&self, x: &[F]) -> Vec<F> {
        assert_eq!(x.len(), self.ncols, "wrong vector length");
        let mut y = vec![F::zero(); self.nrows];
        for (r, c, v) in self.triplets() {
            y[r] = y[r] + v * x[c];
        }
        y
    }
}
