use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use num_traits::Float;
use std::fmt::Debug;

use crate::error::{HmmError, Result};

/// Represents a discrete Hidden Markov Model (HMM), storing:
/// - `initial[s]`: probability of starting in state s
/// - `transition[[s1, s2]]`: probability of transitioning from state s1 to s2
/// - `emission[[s, o]]`: probability of emitting observation o in state s
///
/// # Constraints
/// - The shapes must agree: `initial` has N entries, `transition` is N×N and
///   `emission` is N×M with N, M ≥ 1.
/// - Rows are expected to sum to 1. This is assumed, not enforced.
#[derive(Debug, Clone, PartialEq)]
pub struct HiddenMarkovModel<T> {
    initial: Array1<T>,
    transition: Array2<T>,
    emission: Array2<T>,
}

impl<T> HiddenMarkovModel<T>
where
    T: Float + Debug,
{
    /// Create a new `HiddenMarkovModel` from nested rows.
    ///
    /// The number of states is taken from `initial`, the number of
    /// observation symbols from the first emission row.
    ///
    /// # Errors
    ///
    /// Returns `HmmError::EmptyModel` if there are no states or symbols and
    /// `HmmError::DimensionMismatch` if any row disagrees with those sizes.
    pub fn new(
        initial: Vec<T>,
        transition: Vec<Vec<T>>,
        emission: Vec<Vec<T>>,
    ) -> Result<Self> {
        let n_states = initial.len();
        let n_symbols = emission.first().map_or(0, Vec::len);
        if n_states == 0 || n_symbols == 0 {
            return Err(HmmError::EmptyModel);
        }

        if transition.len() != n_states {
            return Err(HmmError::dimension_mismatch(
                "transition rows",
                n_states,
                transition.len(),
            ));
        }
        for (i, row) in transition.iter().enumerate() {
            if row.len() != n_states {
                return Err(HmmError::dimension_mismatch(
                    format!("transition row {}", i),
                    n_states,
                    row.len(),
                ));
            }
        }

        if emission.len() != n_states {
            return Err(HmmError::dimension_mismatch(
                "emission rows",
                n_states,
                emission.len(),
            ));
        }
        for (i, row) in emission.iter().enumerate() {
            if row.len() != n_symbols {
                return Err(HmmError::dimension_mismatch(
                    format!("emission row {}", i),
                    n_symbols,
                    row.len(),
                ));
            }
        }

        let transition = Array2::from_shape_fn((n_states, n_states), |(i, j)| transition[i][j]);
        let emission = Array2::from_shape_fn((n_states, n_symbols), |(i, k)| emission[i][k]);

        Ok(Self {
            initial: Array1::from(initial),
            transition,
            emission,
        })
    }

    /// Builds a model from arrays that are already laid out as N, N×N and N×M.
    pub fn from_arrays(
        initial: Array1<T>,
        transition: Array2<T>,
        emission: Array2<T>,
    ) -> Result<Self> {
        let n_states = initial.len();
        if n_states == 0 || emission.ncols() == 0 {
            return Err(HmmError::EmptyModel);
        }
        if transition.dim() != (n_states, n_states) {
            let (rows, cols) = transition.dim();
            let found = if rows != n_states { rows } else { cols };
            return Err(HmmError::dimension_mismatch("transition", n_states, found));
        }
        if emission.nrows() != n_states {
            return Err(HmmError::dimension_mismatch(
                "emission rows",
                n_states,
                emission.nrows(),
            ));
        }
        Ok(Self {
            initial,
            transition,
            emission,
        })
    }

    /// Number of hidden states N.
    pub fn n_states(&self) -> usize {
        self.initial.len()
    }

    /// Number of observation symbols M.
    pub fn n_symbols(&self) -> usize {
        self.emission.ncols()
    }

    pub fn initial(&self) -> ArrayView1<'_, T> {
        self.initial.view()
    }

    pub fn transition(&self) -> ArrayView2<'_, T> {
        self.transition.view()
    }

    pub fn emission(&self) -> ArrayView2<'_, T> {
        self.emission.view()
    }

    /// Returns a copy of this model with new transition and emission matrices.
    /// The initial distribution is kept.
    pub fn with_matrices(&self, transition: Array2<T>, emission: Array2<T>) -> Result<Self> {
        if emission.ncols() != self.n_symbols() {
            return Err(HmmError::dimension_mismatch(
                "emission columns",
                self.n_symbols(),
                emission.ncols(),
            ));
        }
        Self::from_arrays(self.initial.clone(), transition, emission)
    }
}

/// Checks that `observations` is non-empty and every index names one of
/// `n_symbols` symbols.
pub(crate) fn check_observations(observations: &[usize], n_symbols: usize) -> Result<()> {
    if observations.is_empty() {
        return Err(HmmError::EmptyObservations);
    }
    match observations.iter().position(|&o| o >= n_symbols) {
        Some(position) => Err(HmmError::SymbolOutOfRange {
            position,
            symbol: observations[position],
            n_symbols,
        }),
        None => Ok(()),
    }
}
