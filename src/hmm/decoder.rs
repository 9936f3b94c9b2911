//! Viterbi decoding over a fixed discrete HMM.
//!
//! The decoder fills an accumulated-probability table `delta` (N×T) and a
//! backpointer table `psi` (N×(T-1)), then walks the backpointers from the
//! best final state to recover the most probable hidden-state path.
//!
//! Two arithmetic modes are supported. In [`ProbabilityMode::Log`] every
//! parameter is mapped to `ln(x + ε)` once when the decoder is built and
//! products become sums; in [`ProbabilityMode::Direct`] raw probabilities are
//! multiplied, which underflows on long sequences but gives exact values for
//! short ones.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use num_traits::Float;
use std::fmt::Debug;
use std::hash::Hash;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{HmmError, Result};
use crate::hmm::model::{check_observations, HiddenMarkovModel};
use crate::hmm::space::LabelSpace;

/// Offset added to every probability before taking its logarithm.
///
/// This is the machine epsilon of `T`, so `ln(0 + ε)` stays finite while
/// the ordering of non-zero probabilities is preserved.
#[inline]
pub fn log_floor_epsilon<T: Float>() -> T {
    T::epsilon()
}

/// Arithmetic used while filling the trellis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbabilityMode {
    /// Log-probabilities, combined by addition.
    #[default]
    Log,
    /// Raw probabilities, combined by multiplication.
    Direct,
}

/// Most probable state path and its probability.
///
/// `probability` is a log-probability when the path came from a
/// [`ProbabilityMode::Log`] decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct ViterbiPath<T> {
    pub states: Vec<usize>,
    pub probability: T,
}

impl<T> ViterbiPath<T> {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Maps the state indices of this path to labels.
    pub fn relabel<S>(&self, states: &LabelSpace<S>) -> Result<Vec<S>>
    where
        S: Eq + Hash + Clone + Debug,
    {
        states.labels_for(&self.states)
    }
}

/// Filled Viterbi tables for one observation sequence.
#[derive(Debug, Clone)]
pub struct Trellis<T> {
    /// `delta[[j, t]]`: best score of any path ending in state j at time t.
    delta: Array2<T>,
    /// `psi[[j, t]]`: predecessor at time t of state j at time t + 1.
    psi: Array2<usize>,
}

impl<T> Trellis<T>
where
    T: Float + Debug,
{
    pub fn delta(&self) -> ArrayView2<'_, T> {
        self.delta.view()
    }

    pub fn backpointers(&self) -> ArrayView2<'_, usize> {
        self.psi.view()
    }

    /// Number of time steps T.
    pub fn len(&self) -> usize {
        self.delta.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.delta.ncols() == 0
    }

    /// State with the highest score at the last time step, and that score.
    pub fn best_final_state(&self) -> (usize, T) {
        let last = self.delta.ncols() - 1;
        argmax(self.delta.column(last).iter().copied())
    }

    /// Walks the backpointers from the best final state.
    ///
    /// Every position, including the first, is recovered from `psi`.
    pub fn backtrack(&self) -> ViterbiPath<T> {
        let t_len = self.len();
        let (last_state, probability) = self.best_final_state();

        let mut states = vec![0_usize; t_len];
        states[t_len - 1] = last_state;
        for t in (0..t_len - 1).rev() {
            states[t] = self.psi[[states[t + 1], t]];
        }

        ViterbiPath {
            states,
            probability,
        }
    }
}

/// Index and value of the largest item. The lowest index wins ties.
fn argmax<T, I>(values: I) -> (usize, T)
where
    T: Float,
    I: IntoIterator<Item = T>,
{
    let mut best_index = 0;
    let mut best = T::neg_infinity();
    for (i, v) in values.into_iter().enumerate() {
        if i == 0 || v > best {
            best = v;
            best_index = i;
        }
    }
    (best_index, best)
}

/// Viterbi decoder for a fixed model.
///
/// The decoder holds the model parameters in the domain selected by its
/// [`ProbabilityMode`]. Decoding does not mutate the decoder, so one
/// instance can decode any number of sequences.
///
/// # Examples
///
/// ```
/// use viterbi_hmm::{Decoder, HiddenMarkovModel, ProbabilityMode};
///
/// let hmm = HiddenMarkovModel::new(
///     vec![0.6, 0.4],
///     vec![vec![0.7, 0.3], vec![0.4, 0.6]],
///     vec![vec![0.5, 0.4, 0.1], vec![0.1, 0.3, 0.6]],
/// )
/// .unwrap();
///
/// let decoder = Decoder::new(&hmm, ProbabilityMode::Direct);
/// let path = decoder.decode(&[0, 1, 2]).unwrap();
/// assert_eq!(path.states, vec![0, 0, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct Decoder<T> {
    mode: ProbabilityMode,
    initial: Array1<T>,
    transition: Array2<T>,
    emission: Array2<T>,
}

impl<T> Decoder<T>
where
    T: Float + Debug + Send + Sync,
{
    pub fn new(model: &HiddenMarkovModel<T>, mode: ProbabilityMode) -> Self {
        let to_domain = |x: T| match mode {
            ProbabilityMode::Log => (x + log_floor_epsilon::<T>()).ln(),
            ProbabilityMode::Direct => x,
        };
        Self {
            mode,
            initial: model.initial().mapv(to_domain),
            transition: model.transition().mapv(to_domain),
            emission: model.emission().mapv(to_domain),
        }
    }

    pub fn mode(&self) -> ProbabilityMode {
        self.mode
    }

    pub fn n_states(&self) -> usize {
        self.initial.len()
    }

    pub fn n_symbols(&self) -> usize {
        self.emission.ncols()
    }

    #[inline]
    fn combine(&self, a: T, b: T) -> T {
        match self.mode {
            ProbabilityMode::Log => a + b,
            ProbabilityMode::Direct => a * b,
        }
    }

    /// Best predecessor for `state` given the previous column of `delta`,
    /// returned as (new delta entry, backpointer).
    fn extend(&self, previous: ArrayView1<'_, T>, state: usize, symbol: usize) -> (T, usize) {
        let (arg, best) = argmax(
            self.transition
                .column(state)
                .iter()
                .zip(previous.iter())
                .map(|(&a, &d)| self.combine(a, d)),
        );
        (self.combine(best, self.emission[[state, symbol]]), arg)
    }

    #[cfg(not(feature = "parallel"))]
    fn step(&self, previous: ArrayView1<'_, T>, symbol: usize) -> Vec<(T, usize)> {
        (0..self.n_states())
            .map(|j| self.extend(previous, j, symbol))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn step(&self, previous: ArrayView1<'_, T>, symbol: usize) -> Vec<(T, usize)> {
        (0..self.n_states())
            .into_par_iter()
            .map(|j| self.extend(previous, j, symbol))
            .collect()
    }

    /// Fills the Viterbi tables for `observations` (symbol indices).
    ///
    /// # Errors
    ///
    /// Returns `HmmError::EmptyObservations` for an empty sequence and
    /// `HmmError::SymbolOutOfRange` for an index ≥ M.
    pub fn trellis(&self, observations: &[usize]) -> Result<Trellis<T>> {
        check_observations(observations, self.n_symbols())?;

        let n = self.n_states();
        let t_len = observations.len();
        let mut delta = Array2::zeros((n, t_len));
        let mut psi = Array2::zeros((n, t_len - 1));

        let o0 = observations[0];
        for i in 0..n {
            delta[[i, 0]] = self.combine(self.initial[i], self.emission[[i, o0]]);
        }

        for t in 1..t_len {
            let column = self.step(delta.column(t - 1), observations[t]);
            for (j, (value, arg)) in column.into_iter().enumerate() {
                delta[[j, t]] = value;
                psi[[j, t - 1]] = arg;
            }
        }

        Ok(Trellis { delta, psi })
    }

    /// Decodes the most probable state path for `observations` (symbol indices).
    pub fn decode(&self, observations: &[usize]) -> Result<ViterbiPath<T>> {
        Ok(self.trellis(observations)?.backtrack())
    }

    /// Decodes observations given as labels of `symbols`.
    ///
    /// # Errors
    ///
    /// Fails if `symbols` does not have one label per model symbol or if an
    /// observation is not in `symbols`.
    pub fn decode_symbols<O>(
        &self,
        symbols: &LabelSpace<O>,
        observations: &[O],
    ) -> Result<ViterbiPath<T>>
    where
        O: Eq + Hash + Clone + Debug,
    {
        if symbols.len() != self.n_symbols() {
            return Err(HmmError::dimension_mismatch(
                "observation space",
                self.n_symbols(),
                symbols.len(),
            ));
        }
        self.decode(&symbols.indices(observations)?)
    }

    /// Decodes labeled observations and returns the path as state labels
    /// together with its probability.
    pub fn decode_labeled<S, O>(
        &self,
        states: &LabelSpace<S>,
        symbols: &LabelSpace<O>,
        observations: &[O],
    ) -> Result<(Vec<S>, T)>
    where
        S: Eq + Hash + Clone + Debug,
        O: Eq + Hash + Clone + Debug,
    {
        if states.len() != self.n_states() {
            return Err(HmmError::dimension_mismatch(
                "state space",
                self.n_states(),
                states.len(),
            ));
        }
        let path = self.decode_symbols(symbols, observations)?;
        Ok((path.relabel(states)?, path.probability))
    }
}

/// Runs the Viterbi algorithm in log space for `hmm` and `observations`.
///
/// Returns the most likely state indices and the log-probability of that path.
pub fn viterbi<T>(hmm: &HiddenMarkovModel<T>, observations: &[usize]) -> Result<ViterbiPath<T>>
where
    T: Float + Debug + Send + Sync,
{
    Decoder::new(hmm, ProbabilityMode::Log).decode(observations)
}
