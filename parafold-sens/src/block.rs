//! Block-sparse Hessian reconstruction from Hessian-vector products.

use std::fmt;

use num_traits::Float;

use crate::coo::CooMatrix;
use crate::oracle::GradientOracle;

/// Errors raised during block-Hessian construction or reconstruction.
#[derive(Clone, Debug, PartialEq)]
pub enum HessianError {
    /// Slot counts differ between blocks; the index structure must be
    /// rectangular.
    RaggedBlocks {
        /// Offending block.
        block: usize,
        /// Slot count of block 0.
        expected: usize,
        /// Slot count of the offending block.
        got: usize,
    },
    /// A flat index is outside the objective's dimension.
    IndexOutOfBounds {
        /// Offending block.
        block: usize,
        /// Offending slot.
        slot: usize,
        /// The out-of-range flat index.
        index: usize,
        /// Objective dimension.
        dim: usize,
    },
    /// The evaluation point's length does not match the objective dimension.
    PointLength {
        /// Objective dimension.
        expected: usize,
        /// Length supplied.
        got: usize,
    },
    /// A Hessian-vector product came back with the wrong length.
    ProductLength {
        /// Slot whose probe produced the bad product.
        slot: usize,
        /// Objective dimension.
        expected: usize,
        /// Length returned by the oracle.
        got: usize,
    },
    /// A Hessian-vector product contained a NaN or infinity; a partial
    /// reconstruction is not meaningful, so the whole estimate is aborted.
    NonFiniteProduct {
        /// Slot whose probe produced the non-finite value.
        slot: usize,
    },
}

impl fmt::Display for HessianError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HessianError::RaggedBlocks {
                block,
                expected,
                got,
            } => write!(
                f,
                "block {} has {} slots but block 0 has {}; the index structure must be rectangular",
                block, got, expected
            ),
            HessianError::IndexOutOfBounds {
                block,
                slot,
                index,
                dim,
            } => write!(
                f,
                "index {} at block {}, slot {} is outside dimension {}",
                index, block, slot, dim
            ),
            HessianError::PointLength { expected, got } => {
                write!(f, "wrong point length: expected {}, got {}", expected, got)
            }
            HessianError::ProductLength {
                slot,
                expected,
                got,
            } => write!(
                f,
                "Hessian-vector product for slot {} has length {}, expected {}",
                slot, got, expected
            ),
            HessianError::NonFiniteProduct { slot } => {
                write!(f, "Hessian-vector product for slot {} is not finite", slot)
            }
        }
    }
}

impl std::error::Error for HessianError {}

/// Reconstructs a block-sparse Hessian from Hessian-vector products.
///
/// The caller declares a rectangular index structure `inds[b][s]` — block
/// `b`, slot `s` — asserting that the Hessian is zero outside the positions
/// the structure implies. One probe vector per slot activates that slot's
/// coordinate in *every* block simultaneously, so a single HVP recovers one
/// column of each block's sub-Hessian: `block_size` products total, instead
/// of one per dimension.
///
/// If the true Hessian has entries outside the declared structure they are
/// silently treated as zero — the structure's adequacy is the caller's
/// responsibility. If it is exact, the reconstruction equals the dense
/// Hessian up to floating-point error.
#[derive(Debug)]
pub struct SparseBlockHessian<'a, O> {
    oracle: &'a O,
    inds: Vec<Vec<usize>>,
    block_size: usize,
    dim: usize,
}

impl<'a, O> SparseBlockHessian<'a, O> {
    /// Validate the index structure and bind it to an objective.
    ///
    /// Fails on ragged or out-of-range structures. Overlapping blocks and
    /// incomplete coverage are legal (the estimate degrades silently); debug
    /// builds print a warning on stderr when blocks share coordinates.
    pub fn new<F>(oracle: &'a O, inds: Vec<Vec<usize>>) -> Result<Self, HessianError>
    where
        F: Float,
        O: GradientOracle<F>,
    {
        let dim = oracle.dim();
        let block_size = inds.first().map_or(0, |b| b.len());
        for (b, block) in inds.iter().enumerate() {
            if block.len() != block_size {
                return Err(HessianError::RaggedBlocks {
                    block: b,
                    expected: block_size,
                    got: block.len(),
                });
            }
            for (s, &i) in block.iter().enumerate() {
                if i >= dim {
                    return Err(HessianError::IndexOutOfBounds {
                        block: b,
                        slot: s,
                        index: i,
                        dim,
                    });
                }
            }
        }

        #[cfg(debug_assertions)]
        {
            let mut seen = vec![false; dim];
            let mut overlaps = 0usize;
            for block in &inds {
                for &i in block {
                    if seen[i] {
                        overlaps += 1;
                    }
                    seen[i] = true;
                }
            }
            if overlaps > 0 {
                eprintln!(
                    "WARNING: block index structure repeats {} flat coordinate(s) across blocks; \
                     probes will mix their columns and the reconstruction is only approximate.",
                    overlaps
                );
            }
        }

        Ok(SparseBlockHessian {
            oracle,
            inds,
            block_size,
            dim,
        })
    }

    /// Number of blocks.
    pub fn num_blocks(&self) -> usize {
        self.inds.len()
    }

    /// Slots per block — also the number of HVP evaluations per estimate.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Estimate the Hessian at `x` as a duplicate-summed COO matrix.
    ///
    /// Runs `block_size` Hessian-vector products; any non-finite product
    /// aborts the estimate.
    pub fn get_block_hessian<F>(&self, x: &[F]) -> Result<CooMatrix<F>, HessianError>
    where
        F: Float,
        O: GradientOracle<F>,
    {
        if x.len() != self.dim {
            return Err(HessianError::PointLength {
                expected: self.dim,
                got: x.len(),
            });
        }
        let mut triplets =
            Vec::with_capacity(self.inds.len() * self.block_size * self.block_size);
        for s in 0..self.block_size {
            let slot_triplets = self.probe_slot(x, s)?;
            triplets.extend(slot_triplets);
        }
        Ok(CooMatrix::from_triplets(self.dim, self.dim, &triplets))
    }

    /// Like [`get_block_hessian`](Self::get_block_hessian), evaluating the
    /// per-slot probes in parallel. Probes share only the read-only point and
    /// index structure, so the result is identical.
    #[cfg(feature = "parallel")]
    pub fn get_block_hessian_par<F>(&self, x: &[F]) -> Result<CooMatrix<F>, HessianError>
    where
        F: Float + Send + Sync,
        O: GradientOracle<F> + Sync,
    {
        use rayon::prelude::*;

        if x.len() != self.dim {
            return Err(HessianError::PointLength {
                expected: self.dim,
                got: x.len(),
            });
        }
        let per_slot: Result<Vec<_>, HessianError> = (0..self.block_size)
            .into_par_iter()
            .map(|s| self.probe_slot(x, s))
            .collect();
        let triplets: Vec<(usize, usize, F)> = per_slot?.into_iter().flatten().collect();
        Ok(CooMatrix::from_triplets(self.dim, self.dim, &triplets))
    }

    /// One probe: activate slot `s` in every block, evaluate the HVP, and
    /// scatter column `s` of every block's sub-Hessian.
    fn probe_slot<F>(&self, x: &[F], s: usize) -> Result<Vec<(usize, usize, F)>, HessianError>
    where
        F: Float,
        O: GradientOracle<F>,
    {
        let mut v = vec![F::zero(); self.dim];
        for block in &self.inds {
            v[block[s]] = F::one();
        }
        let hv = self.oracle.hvp(x, &v);
        if hv.len() != self.dim {
            return Err(HessianError::ProductLength {
                slot: s,
                expected: self.dim,
                got: hv.len(),
            });
        }
        if hv.iter().any(|e| !e.is_finite()) {
            return Err(HessianError::NonFiniteProduct { slot: s });
        }
        let mut triplets = Vec::with_capacity(self.inds.len() * self.block_size);
        for block in &self.inds {
            let col = block[s];
            for &row in block {
                triplets.push((row, col, hv[row]));
            }
        }
        Ok(triplets)
    }
}
