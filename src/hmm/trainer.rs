//! Viterbi training: hard-assignment re-estimation of transition and
//! emission probabilities from decoded state paths.

use log::{debug, info, warn};
use ndarray::{Array2, ArrayView2};
use num_traits::Float;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{HmmError, Result};
use crate::hmm::decoder::{Decoder, ProbabilityMode, ViterbiPath};
use crate::hmm::model::{check_observations, HiddenMarkovModel};
use crate::hmm::space::LabelSpace;

/// What to do with a count row that sums to zero during re-estimation.
///
/// A state that never appears in the decoded path (or only appears at the
/// last position, for transitions) has no counts to normalise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroRowPolicy {
    /// Keep the row from the model being re-estimated.
    #[default]
    KeepPrevious,
    /// Replace the row with a uniform distribution.
    Uniform,
}

/// Configuration options for Viterbi training.
#[derive(Debug, Clone)]
pub struct TrainingConfig<T> {
    /// Maximum number of decode / re-estimate rounds.
    pub max_iterations: usize,
    /// Training stops once the decoded path's log-probability changes by
    /// less than this between two rounds.
    pub tolerance: T,
    pub zero_row_policy: ZeroRowPolicy,
}

impl<T> Default for TrainingConfig<T>
where
    T: Float,
{
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: T::from(1e-6).unwrap_or_else(T::epsilon),
            zero_row_policy: ZeroRowPolicy::default(),
        }
    }
}

impl<T> TrainingConfig<T>
where
    T: Float,
{
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: T) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_zero_row_policy(mut self, policy: ZeroRowPolicy) -> Self {
        self.zero_row_policy = policy;
        self
    }
}

/// Outcome of a training run.
#[derive(Debug, Clone)]
pub struct TrainingResult<T> {
    /// Model after the last re-estimation. The initial distribution is the
    /// one training started from.
    pub model: HiddenMarkovModel<T>,
    /// Number of decode rounds performed.
    pub iterations: usize,
    /// Whether the tolerance was met before the iteration budget ran out.
    pub converged: bool,
    /// Path decoded in the last round, `None` only when `max_iterations` is 0.
    pub last_path: Option<ViterbiPath<T>>,
}

/// Normalises each row of `counts` by its sum.
///
/// Rows summing to zero are filled according to `policy`. Returns how many
/// rows needed the fallback.
fn normalize_rows<T>(
    counts: &mut Array2<T>,
    previous: ArrayView2<'_, T>,
    policy: ZeroRowPolicy,
    what: &str,
) -> usize
where
    T: Float + Debug,
{
    let width = T::from(counts.ncols()).unwrap_or_else(T::one);
    let mut fallbacks = 0;
    for (i, (mut row, prev_row)) in counts.rows_mut().into_iter().zip(previous.rows()).enumerate() {
        let sum = row.fold(T::zero(), |acc, &c| acc + c);
        if sum > T::zero() {
            row.mapv_inplace(|c| c / sum);
            continue;
        }
        fallbacks += 1;
        warn!("{} row {} has no counts, using {:?} fallback", what, i, policy);
        match policy {
            ZeroRowPolicy::KeepPrevious => row.assign(&prev_row),
            ZeroRowPolicy::Uniform => row.fill(T::one() / width),
        }
    }
    fallbacks
}

/// Re-estimates the transition and emission matrices of `previous` from a
/// decoded state path by frequency counting.
///
/// - Transitions count every consecutive pair `(path[t-1], path[t])`.
/// - Emissions count every pair `(path[t], observations[t])`.
/// - Each count row is divided by its sum; empty rows follow `policy`.
/// - The initial distribution is never changed.
///
/// # Errors
///
/// Fails if `path` and `observations` differ in length, are empty, or hold
/// indices outside the model.
pub fn reestimate<T>(
    path: &[usize],
    observations: &[usize],
    previous: &HiddenMarkovModel<T>,
    policy: ZeroRowPolicy,
) -> Result<HiddenMarkovModel<T>>
where
    T: Float + Debug,
{
    let n = previous.n_states();
    let m = previous.n_symbols();
    if path.len() != observations.len() {
        return Err(HmmError::dimension_mismatch(
            "decoded path",
            observations.len(),
            path.len(),
        ));
    }
    check_observations(observations, m)?;
    if let Some(&state) = path.iter().find(|&&s| s >= n) {
        return Err(HmmError::dimension_mismatch("state index bound", n, state + 1));
    }

    let mut transition = Array2::<T>::zeros((n, n));
    for pair in path.windows(2) {
        transition[[pair[0], pair[1]]] = transition[[pair[0], pair[1]]] + T::one();
    }

    let mut emission = Array2::<T>::zeros((n, m));
    for (&state, &symbol) in path.iter().zip(observations) {
        emission[[state, symbol]] = emission[[state, symbol]] + T::one();
    }

    let empty_transitions =
        normalize_rows(&mut transition, previous.transition(), policy, "transition");
    let empty_emissions = normalize_rows(&mut emission, previous.emission(), policy, "emission");
    debug!(
        "re-estimated from {} steps ({} empty transition rows, {} empty emission rows)",
        path.len(),
        empty_transitions,
        empty_emissions
    );

    previous.with_matrices(transition, emission)
}

/// Alternates Viterbi decoding and re-estimation until the decoded path's
/// probability stops changing.
///
/// # Examples
///
/// ```
/// use viterbi_hmm::{HiddenMarkovModel, TrainingConfig, ViterbiTrainer};
///
/// let hmm = HiddenMarkovModel::new(
///     vec![0.5, 0.5],
///     vec![vec![0.8, 0.2], vec![0.2, 0.8]],
///     vec![vec![0.9, 0.1], vec![0.1, 0.9]],
/// )
/// .unwrap();
/// let observations = [0, 0, 0, 1, 1, 1, 0, 0, 0, 1, 1, 1];
///
/// let trainer = ViterbiTrainer::new(TrainingConfig::default().with_max_iterations(10));
/// let result = trainer.train(&hmm, &observations).unwrap();
/// assert!(result.converged);
/// ```
#[derive(Debug, Clone)]
pub struct ViterbiTrainer<T> {
    config: TrainingConfig<T>,
}

impl<T> Default for ViterbiTrainer<T>
where
    T: Float,
{
    fn default() -> Self {
        Self {
            config: TrainingConfig::default(),
        }
    }
}

impl<T> ViterbiTrainer<T>
where
    T: Float + Debug + Send + Sync,
{
    pub fn new(config: TrainingConfig<T>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig<T> {
        &self.config
    }

    /// Trains on observations given as symbol indices.
    ///
    /// Each round decodes `observations` in log space with a fresh decoder.
    /// From the second round on, a change in path log-probability below the
    /// tolerance ends training as converged. Otherwise the matrices are
    /// re-estimated from the decoded path. Running out of rounds is not an
    /// error; the result reports `converged == false`.
    pub fn train(
        &self,
        model: &HiddenMarkovModel<T>,
        observations: &[usize],
    ) -> Result<TrainingResult<T>> {
        check_observations(observations, model.n_symbols())?;

        let mut current = model.clone();
        let mut previous_probability: Option<T> = None;
        let mut last_path = None;

        for iteration in 1..=self.config.max_iterations {
            let path = Decoder::new(&current, ProbabilityMode::Log).decode(observations)?;
            info!(
                "iteration {}: path log-probability {:?}",
                iteration, path.probability
            );

            if let Some(previous) = previous_probability {
                if (previous - path.probability).abs() < self.config.tolerance {
                    info!("converged after {} iterations", iteration);
                    return Ok(TrainingResult {
                        model: current,
                        iterations: iteration,
                        converged: true,
                        last_path: Some(path),
                    });
                }
            }
            previous_probability = Some(path.probability);

            current = reestimate(
                &path.states,
                observations,
                &current,
                self.config.zero_row_policy,
            )?;
            last_path = Some(path);
        }

        info!(
            "stopped after {} iterations without converging",
            self.config.max_iterations
        );
        Ok(TrainingResult {
            model: current,
            iterations: self.config.max_iterations,
            converged: false,
            last_path,
        })
    }

    /// Trains on labeled observations.
    ///
    /// `states` and `symbols` must have one label per model state and symbol.
    pub fn train_labeled<S, O>(
        &self,
        model: &HiddenMarkovModel<T>,
        states: &LabelSpace<S>,
        symbols: &LabelSpace<O>,
        observations: &[O],
    ) -> Result<TrainingResult<T>>
    where
        S: Eq + Hash + Clone + Debug,
        O: Eq + Hash + Clone + Debug,
    {
        if states.len() != model.n_states() {
            return Err(HmmError::dimension_mismatch(
                "state space",
                model.n_states(),
                states.len(),
            ));
        }
        if symbols.len() != model.n_symbols() {
            return Err(HmmError::dimension_mismatch(
                "observation space",
                model.n_symbols(),
                symbols.len(),
            ));
        }
        self.train(model, &symbols.indices(observations)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_state() -> HiddenMarkovModel<f64> {
        HiddenMarkovModel::new(
            vec![0.5, 0.5],
            vec![vec![0.8, 0.2], vec![0.2, 0.8]],
            vec![vec![0.9, 0.1], vec![0.1, 0.9]],
        )
        .unwrap()
    }

    fn assert_row_stochastic(matrix: ArrayView2<'_, f64>) {
        for row in matrix.rows() {
            assert!(row.iter().all(|v| v.is_finite()));
            assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_reestimate_counts() {
        let path = [0, 0, 1, 1, 0];
        let observations = [0, 1, 1, 1, 0];
        let updated =
            reestimate(&path, &observations, &two_state(), ZeroRowPolicy::Uniform).unwrap();

        // pairs: 0->0, 0->1, 1->1, 1->0
        assert_relative_eq!(updated.transition()[[0, 0]], 0.5);
        assert_relative_eq!(updated.transition()[[0, 1]], 0.5);
        assert_relative_eq!(updated.transition()[[1, 0]], 0.5);
        assert_relative_eq!(updated.transition()[[1, 1]], 0.5);

        // state 0 emitted 0, 1, 0; state 1 emitted 1, 1
        assert_relative_eq!(updated.emission()[[0, 0]], 2.0 / 3.0);
        assert_relative_eq!(updated.emission()[[0, 1]], 1.0 / 3.0);
        assert_relative_eq!(updated.emission()[[1, 0]], 0.0);
        assert_relative_eq!(updated.emission()[[1, 1]], 1.0);

        assert_eq!(updated.initial(), two_state().initial());
        assert_row_stochastic(updated.transition());
        assert_row_stochastic(updated.emission());
    }

    #[test]
    fn test_reestimate_visiting_every_state_twice_is_finite() {
        let hmm = HiddenMarkovModel::new(
            vec![0.4, 0.3, 0.3],
            vec![vec![1.0 / 3.0; 3]; 3],
            vec![vec![0.25; 4]; 3],
        )
        .unwrap();
        let path = [0, 1, 2, 0, 1, 2, 0];
        let observations = [3, 2, 1, 0, 0, 1, 2];
        let updated = reestimate(&path, &observations, &hmm, ZeroRowPolicy::KeepPrevious).unwrap();
        assert_row_stochastic(updated.transition());
        assert_row_stochastic(updated.emission());
    }

    #[test]
    fn test_zero_row_keeps_previous() {
        // state 1 only appears last: no outgoing transitions counted
        let path = [0, 0, 0, 1];
        let observations = [0, 0, 1, 1];
        let hmm = two_state();
        let updated = reestimate(&path, &observations, &hmm, ZeroRowPolicy::KeepPrevious).unwrap();
        assert_relative_eq!(updated.transition()[[0, 0]], 2.0 / 3.0);
        assert_relative_eq!(updated.transition()[[0, 1]], 1.0 / 3.0);
        assert_eq!(updated.transition().row(1), hmm.transition().row(1));
        assert_row_stochastic(updated.transition());
    }

    #[test]
    fn test_zero_row_uniform() {
        let hmm = HiddenMarkovModel::new(
            vec![0.5, 0.25, 0.25],
            vec![vec![0.9, 0.05, 0.05]; 3],
            vec![vec![0.7, 0.3]; 3],
        )
        .unwrap();
        // state 2 never visited
        let path = [0, 1, 0, 1];
        let observations = [0, 1, 1, 0];
        let updated = reestimate(&path, &observations, &hmm, ZeroRowPolicy::Uniform).unwrap();
        for j in 0..3 {
            assert_relative_eq!(updated.transition()[[2, j]], 1.0 / 3.0);
        }
        assert_relative_eq!(updated.emission()[[2, 0]], 0.5);
        assert_relative_eq!(updated.emission()[[2, 1]], 0.5);
        assert_row_stochastic(updated.transition());
        assert_row_stochastic(updated.emission());
    }

    #[test]
    fn test_reestimate_rejects_bad_input() {
        let hmm = two_state();
        assert!(reestimate(&[0, 1], &[0], &hmm, ZeroRowPolicy::Uniform).is_err());
        assert!(reestimate(&[0, 2], &[0, 1], &hmm, ZeroRowPolicy::Uniform).is_err());
        assert!(reestimate(&[0, 1], &[0, 2], &hmm, ZeroRowPolicy::Uniform).is_err());
        assert_eq!(
            reestimate(&[], &[], &hmm, ZeroRowPolicy::Uniform).unwrap_err(),
            HmmError::EmptyObservations
        );
    }

    #[test]
    fn test_train_converges_on_separable_sequence() {
        let observations = [0, 0, 0, 1, 1, 1, 0, 0, 0, 1, 1, 1];
        let trainer = ViterbiTrainer::new(TrainingConfig::default().with_max_iterations(10));
        let result = trainer.train(&two_state(), &observations).unwrap();

        // round 1 decodes the runs exactly, round 2 re-fits to the same
        // path, round 3 sees an unchanged model
        assert!(result.converged);
        assert_eq!(result.iterations, 3);
        assert_eq!(result.last_path.unwrap().states, observations.to_vec());

        let t = result.model.transition();
        assert_relative_eq!(t[[0, 0]], 4.0 / 6.0);
        assert_relative_eq!(t[[0, 1]], 2.0 / 6.0);
        assert_relative_eq!(t[[1, 0]], 1.0 / 5.0);
        assert_relative_eq!(t[[1, 1]], 4.0 / 5.0);
        assert_eq!(result.model.emission(), Array2::<f64>::eye(2));
    }

    #[test]
    fn test_train_stops_at_iteration_budget() {
        let observations = [0, 1, 1, 0, 1, 0, 0, 1];
        let config = TrainingConfig::default()
            .with_max_iterations(4)
            .with_tolerance(0.0);
        let result = ViterbiTrainer::new(config)
            .train(&two_state(), &observations)
            .unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 4);
        assert!(result.last_path.is_some());
        assert_row_stochastic(result.model.transition());
        assert_row_stochastic(result.model.emission());
    }

    #[test]
    fn test_train_with_zero_iterations() {
        let trainer = ViterbiTrainer::new(TrainingConfig::default().with_max_iterations(0));
        let result = trainer.train(&two_state(), &[0, 1]).unwrap();
        assert_eq!(result.iterations, 0);
        assert!(!result.converged);
        assert!(result.last_path.is_none());
        assert_eq!(result.model, two_state());
    }

    #[test]
    fn test_train_rejects_empty_observations() {
        let trainer = ViterbiTrainer::<f64>::default();
        assert_eq!(
            trainer.train(&two_state(), &[]).unwrap_err(),
            HmmError::EmptyObservations
        );
    }

    #[test]
    fn test_train_labeled_space_sizes() {
        let trainer = ViterbiTrainer::new(TrainingConfig::default().with_max_iterations(5));
        let states = LabelSpace::new(vec!["A", "B"]).unwrap();
        let symbols = LabelSpace::new(vec!['x', 'y']).unwrap();
        let result = trainer
            .train_labeled(&two_state(), &states, &symbols, &['x', 'x', 'y', 'y'])
            .unwrap();
        assert!(result.iterations <= 5);

        let three = LabelSpace::new(vec!['x', 'y', 'z']).unwrap();
        assert!(trainer
            .train_labeled(&two_state(), &states, &three, &['x'])
            .is_err());
        assert!(trainer
            .train_labeled(&two_state(), &states, &symbols, &['x', 'q'])
            .is_err());
    }

    #[test]
    fn test_default_config() {
        let config = TrainingConfig::<f64>::default();
        assert_eq!(config.max_iterations, 100);
        assert_relative_eq!(config.tolerance, 1e-6);
        assert_eq!(config.zero_row_policy, ZeroRowPolicy::KeepPrevious);
    }
}
