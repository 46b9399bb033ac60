//! Adapter presenting a function of folded values as a function of flat
//! vectors.

use num_traits::Float;

use crate::error::PatternError;
use crate::folded::Folded;
use crate::pattern::Pattern;

/// Wraps a function of structured arguments so it can be called with flat
/// vectors instead.
///
/// Each wrapped argument carries its own pattern and free flag; `call` folds
/// the flat slices back (length-checked, domain check skipped — flat points
/// typically come from an optimizer moving through free space) and invokes
/// the wrapped function. The adapter holds no other state, so the call is
/// referentially transparent in its inputs and differentiable wherever the
/// wrapped function is. Arguments that are not flattened are captured by the
/// wrapped closure.
pub struct FlattenedFunction<G> {
    args: Vec<(Pattern, bool)>,
    func: G,
}

impl<G> FlattenedFunction<G> {
    /// Wrap a function of a single structured argument.
    pub fn new(pattern: impl Into<Pattern>, free: bool, func: G) -> Self {
        FlattenedFunction {
            args: vec![(pattern.into(), free)],
            func,
        }
    }

    /// Wrap a function of several structured arguments, one `(pattern, free)`
    /// pair per argument in call order.
    pub fn with_args(args: Vec<(Pattern, bool)>, func: G) -> Self {
        FlattenedFunction { args, func }
    }

    /// Number of flattened arguments.
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Flat length of argument `i` under its declared mode.
    pub fn flat_length(&self, i: usize) -> usize {
        let (pattern, free) = &self.args[i];
        pattern.flat_length(*free)
    }

    /// The `(pattern, free)` declaration for argument `i`.
    pub fn arg(&self, i: usize) -> (&Pattern, bool) {
        let (pattern, free) = &self.args[i];
        (pattern, *free)
    }

    /// Call the wrapped function with one flat slice per wrapped argument.
    pub fn call<T, R>(&self, flat_args: &[&[T]]) -> Result<R, PatternError>
    where
        T: Float,
        G: Fn(&[Folded<T>]) -> R,
    {
        if flat_args.len() != self.args.len() {
            return Err(PatternError::Arity {
                expected: self.args.len(),
                got: flat_args.len(),
            });
        }
        let mut folded = Vec::with_capacity(self.args.len());
        for ((pattern, free), flat) in self.args.iter().zip(flat_args) {
            folded.push(pattern.fold_unchecked(flat, *free)?);
        }
        Ok((self.func)(&folded))
    }

    /// Convenience for the single-argument case.
    pub fn call1<T, R>(&self, flat: &[T]) -> Result<R, PatternError>
    where
        T: Float,
        G: Fn(&[Folded<T>]) -> R,
    {
        self.call(&[flat])
    }
}
