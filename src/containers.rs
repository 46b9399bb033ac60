//! Composite patterns: ordered dicts and arrays of a repeated base pattern.

use ndarray::{ArrayD, IxDyn};
use num_traits::Float;

use crate::error::PatternError;
use crate::folded::Folded;
use crate::pattern::Pattern;

/// An ordered mapping from names to sub-patterns.
///
/// The flat form concatenates the sub-patterns' flat forms in insertion
/// order; the folded form is a [`Folded::Dict`]. Flat-segment offsets are
/// derived from the preceding sub-patterns' flat lengths, so the layout is a
/// pure function of the construction order.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatternDict {
    entries: Vec<(String, Pattern)>,
}

impl PatternDict {
    /// Empty dict pattern.
    pub fn new() -> Self {
        PatternDict {
            entries: Vec::new(),
        }
    }

    /// Append a named sub-pattern. Names must be unique.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        pattern: impl Into<Pattern>,
    ) -> Result<(), PatternError> {
        let name = name.into();
        if self.entries.iter().any(|(n, _)| *n == name) {
            return Err(PatternError::DuplicateEntry(name));
        }
        self.entries.push((name, pattern.into()));
        Ok(())
    }

    /// Look up a sub-pattern by name.
    pub fn get(&self, name: &str) -> Option<&Pattern> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    /// Iterate `(name, sub-pattern)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Pattern)> {
        self.entries.iter().map(|(n, p)| (n.as_str(), p))
    }

    /// Number of sub-patterns.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dict holds no sub-patterns.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total flat length in the given mode.
    pub fn flat_length(&self, free: bool) -> usize {
        self.entries.iter().map(|(_, p)| p.flat_length(free)).sum()
    }

    /// Flat offset of a named sub-pattern's segment, if present.
    pub fn flat_offset(&self, name: &str, free: bool) -> Option<usize> {
        let mut offset = 0;
        for (n, p) in &self.entries {
            if n == name {
                return Some(offset);
            }
            offset += p.flat_length(free);
        }
        None
    }

    pub(crate) fn validate<T: Float>(&self, folded: &Folded<T>) -> (bool, String) {
        let entries = match folded.as_dict() {
            Ok(e) => e,
            Err(_) => return (false, "expected a dict folded value".to_string()),
        };
        for (name, _) in entries {
            if self.get(name).is_none() {
                return (false, format!("unexpected entry '{}'", name));
            }
        }
        for (name, sub) in &self.entries {
            let value = match folded.get(name) {
                Some(v) => v,
                None => return (false, format!("missing entry '{}'", name)),
            };
            let (ok, msg) = sub.validate_folded(value);
            if !ok {
                return (false, format!("{}: {}", name, msg));
            }
        }
        (true, String::new())
    }

    pub(crate) fn flatten<T: Float>(
        &self,
        folded: &Folded<T>,
        free: bool,
    ) -> Result<Vec<T>, PatternError> {
        let (ok, msg) = self.validate(folded);
        if !ok {
            return Err(PatternError::Constraint(msg));
        }
        let mut out = Vec::with_capacity(self.flat_length(free));
        for (name, sub) in &self.entries {
            let value = folded
                .get(name)
                .ok_or_else(|| PatternError::MissingEntry(name.clone()))?;
            out.extend(sub.flatten(value, free)?);
        }
        Ok(out)
    }

    pub(crate) fn fold<T: Float>(
        &self,
        flat: &[T],
        free: bool,
        validate: bool,
    ) -> Result<Folded<T>, PatternError> {
        let expected = self.flat_length(free);
        if flat.len() != expected {
            return Err(PatternError::WrongLength {
                expected,
                got: flat.len(),
            });
        }
        let mut out = Vec::with_capacity(self.entries.len());
        let mut offset = 0;
        for (name, sub) in &self.entries {
            let len = sub.flat_length(free);
            let value = sub.fold_impl(&flat[offset..offset + len], free, validate)?;
            out.push((name.clone(), value));
            offset += len;
        }
        Ok(Folded::Dict(out))
    }

    pub(crate) fn empty_bool(&self, default: bool) -> Folded<bool> {
        Folded::Dict(
            self.entries
                .iter()
                .map(|(n, p)| (n.clone(), p.empty_bool(default)))
                .collect(),
        )
    }

    pub(crate) fn flat_indices(
        &self,
        mask: &Folded<bool>,
        free: bool,
        offset: usize,
        out: &mut Vec<usize>,
    ) -> Result<(), PatternError> {
        let mut sub_offset = offset;
        for (name, sub) in &self.entries {
            let sub_mask = mask
                .get(name)
                .ok_or_else(|| PatternError::MissingEntry(name.clone()))?;
            sub.flat_indices_impl(sub_mask, free, sub_offset, out)?;
            sub_offset += sub.flat_length(free);
        }
        Ok(())
    }
}

/// A fixed outer array of one repeated base pattern.
///
/// The base pattern must fold to an array; the folded value is an array of
/// shape `outer ++ base`, and the flat form concatenates the base pattern's
/// flat form once per outer cell, cells in row-major order.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatternArray {
    outer_shape: Vec<usize>,
    base: Box<Pattern>,
    base_shape: Vec<usize>,
}

impl PatternArray {
    /// Replicate `base` over the given outer shape.
    pub fn new(outer_shape: &[usize], base: impl Into<Pattern>) -> Result<Self, PatternError> {
        let base = base.into();
        let base_shape = base.shape().ok_or_else(|| {
            PatternError::Constraint(
                "pattern arrays require an array-shaped base pattern".to_string(),
            )
        })?;
        if base_shape.iter().product::<usize>() == 0 {
            return Err(PatternError::Constraint(
                "pattern arrays require a base pattern with at least one entry".to_string(),
            ));
        }
        Ok(PatternArray {
            outer_shape: outer_shape.to_vec(),
            base: Box::new(base),
            base_shape,
        })
    }

    /// Outer replication shape.
    pub fn outer_shape(&self) -> &[usize] {
        &self.outer_shape
    }

    /// The repeated base pattern.
    pub fn base(&self) -> &Pattern {
        &self.base
    }

    /// Folded array shape: outer shape followed by the base shape.
    pub fn shape(&self) -> Vec<usize> {
        let mut s = self.outer_shape.clone();
        s.extend_from_slice(&self.base_shape);
        s
    }

    /// Number of outer cells.
    pub fn outer_len(&self) -> usize {
        self.outer_shape.iter().product()
    }

    /// Total flat length in the given mode.
    pub fn flat_length(&self, free: bool) -> usize {
        self.outer_len() * self.base.flat_length(free)
    }

    fn base_folded_len(&self) -> usize {
        self.base_shape.iter().product()
    }

    /// Row-major base-shaped cells of a folded array value.
    fn cells<A: Copy>(&self, folded: &ArrayD<A>) -> Result<Vec<ArrayD<A>>, PatternError> {
        let shape = self.shape();
        if folded.shape() != shape.as_slice() {
            return Err(PatternError::Constraint(format!(
                "wrong shape for pattern array: expected {:?}, got {:?}",
                shape,
                folded.shape()
            )));
        }
        let entries: Vec<A> = folded.iter().copied().collect();
        let cell_len = self.base_folded_len();
        Ok(entries
            .chunks(cell_len)
            .map(|chunk| {
                ArrayD::from_shape_vec(IxDyn(&self.base_shape), chunk.to_vec())
                    .expect("chunk length matches the base shape")
            })
            .collect())
    }

    pub(crate) fn validate<T: Float>(&self, folded: &ArrayD<T>) -> (bool, String) {
        let cells = match self.cells(folded) {
            Ok(c) => c,
            Err(e) => return (false, e.to_string()),
        };
        for (k, cell) in cells.iter().enumerate() {
            let (ok, msg) = self.base.validate_folded(&Folded::Array(cell.clone()));
            if !ok {
                return (false, format!("element {}: {}", k, msg));
            }
        }
        (true, String::new())
    }

    pub(crate) fn flatten<T: Float>(
        &self,
        folded: &ArrayD<T>,
        free: bool,
    ) -> Result<Vec<T>, PatternError> {
        let cells = self.cells(folded)?;
        let mut out = Vec::with_capacity(self.flat_length(free));
        for cell in cells {
            out.extend(self.base.flatten(&Folded::Array(cell), free)?);
        }
        Ok(out)
    }

    pub(crate) fn fold<T: Float>(
        &self,
        flat: &[T],
        free: bool,
        validate: bool,
    ) -> Result<Folded<T>, PatternError> {
        let expected = self.flat_length(free);
        if flat.len() != expected {
            return Err(PatternError::WrongLength {
                expected,
                got: flat.len(),
            });
        }
        let block = self.base.flat_length(free);
        let mut entries = Vec::with_capacity(self.outer_len() * self.base_folded_len());
        for chunk in flat.chunks(block) {
            let cell = self.base.fold_impl(chunk, free, validate)?;
            let arr = cell
                .as_array()
                .expect("array-shaped base patterns fold to arrays");
            entries.extend(arr.iter().copied());
        }
        let folded = ArrayD::from_shape_vec(IxDyn(&self.shape()), entries)
            .expect("cell count and cell length match the folded shape");
        Ok(Folded::Array(folded))
    }

    pub(crate) fn empty_bool(&self, default: bool) -> Folded<bool> {
        Folded::Array(ArrayD::from_elem(IxDyn(&self.shape()), default))
    }

    pub(crate) fn flat_indices(
        &self,
        mask: &ArrayD<bool>,
        free: bool,
        offset: usize,
        out: &mut Vec<usize>,
    ) -> Result<(), PatternError> {
        let cells = self.cells(mask)?;
        let block = self.base.flat_length(free);
        for (k, cell) in cells.into_iter().enumerate() {
            self.base.flat_indices_impl(
                &Folded::Array(cell),
                free,
                offset + k * block,
                out,
            )?;
        }
        Ok(())
    }
}
