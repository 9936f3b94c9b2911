use log::debug;
use ndarray::ArrayView1;
use num_traits::Float;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, WeightedIndex};
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{HmmError, Result};
use crate::hmm::model::HiddenMarkovModel;
use crate::hmm::space::LabelSpace;

/// A sampled hidden-state sequence and the observations it emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationSequence {
    pub states: Vec<usize>,
    pub observations: Vec<usize>,
}

impl ObservationSequence {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

fn categorical<T>(row: ArrayView1<'_, T>, what: &str) -> Result<WeightedIndex<f64>>
where
    T: Float,
{
    let weights = row.iter().map(|p| p.to_f64().unwrap_or(f64::NAN));
    WeightedIndex::new(weights)
        .map_err(|e| HmmError::invalid_distribution(format!("{}: {}", what, e)))
}

/// Samples `length` steps from `model`.
///
/// The first state is drawn from the initial distribution, every later one
/// from the transition row of its predecessor, and each state emits one
/// symbol drawn from its emission row. The same `seed` always yields the
/// same sequence.
///
/// # Errors
///
/// Returns `HmmError::InvalidDistribution` if the initial distribution or
/// any transition or emission row is all zero or holds a negative or NaN
/// weight. Every row is checked before sampling starts, including rows of
/// states the walk would never reach.
///
/// # Examples
///
/// ```
/// use viterbi_hmm::{generate_observations, HiddenMarkovModel};
///
/// let hmm = HiddenMarkovModel::new(
///     vec![0.9999, 0.0001],
///     vec![vec![0.95, 0.05], vec![0.10, 0.90]],
///     vec![vec![1.0 / 6.0; 6], vec![0.1, 0.1, 0.1, 0.1, 0.1, 0.5]],
/// )
/// .unwrap();
///
/// let rolls = generate_observations(&hmm, 300, 515).unwrap();
/// assert_eq!(rolls.len(), 300);
/// assert_eq!(rolls, generate_observations(&hmm, 300, 515).unwrap());
/// ```
pub fn generate_observations<T>(
    model: &HiddenMarkovModel<T>,
    length: usize,
    seed: u64,
) -> Result<ObservationSequence>
where
    T: Float + Debug,
{
    let mut sequence = ObservationSequence {
        states: Vec::with_capacity(length),
        observations: Vec::with_capacity(length),
    };
    if length == 0 {
        return Ok(sequence);
    }

    let initial = categorical(model.initial(), "initial distribution")?;
    let transitions = model
        .transition()
        .rows()
        .into_iter()
        .enumerate()
        .map(|(i, row)| categorical(row, &format!("transition row {}", i)))
        .collect::<Result<Vec<_>>>()?;
    let emissions = model
        .emission()
        .rows()
        .into_iter()
        .enumerate()
        .map(|(i, row)| categorical(row, &format!("emission row {}", i)))
        .collect::<Result<Vec<_>>>()?;

    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut state = initial.sample(&mut rng);
    for t in 0..length {
        if t > 0 {
            state = transitions[state].sample(&mut rng);
        }
        sequence.states.push(state);
        sequence.observations.push(emissions[state].sample(&mut rng));
    }

    debug!("sampled {} observations with seed {}", length, seed);
    Ok(sequence)
}

/// Samples like [`generate_observations`] and maps the result to labels.
///
/// Returns `(true states, observations)`.
pub fn generate_labeled<T, S, O>(
    model: &HiddenMarkovModel<T>,
    states: &LabelSpace<S>,
    symbols: &LabelSpace<O>,
    length: usize,
    seed: u64,
) -> Result<(Vec<S>, Vec<O>)>
where
    T: Float + Debug,
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
    let sequence = generate_observations(model, length, seed)?;
    Ok((
        states.labels_for(&sequence.states)?,
        symbols.labels_for(&sequence.observations)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_die() -> HiddenMarkovModel<f64> {
        HiddenMarkovModel::new(
            vec![0.9999, 0.0001],
            vec![vec![0.95, 0.05], vec![0.10, 0.90]],
            vec![vec![1.0 / 6.0; 6], vec![0.1, 0.1, 0.1, 0.1, 0.1, 0.5]],
        )
        .unwrap()
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let hmm = loaded_die();
        let a = generate_observations(&hmm, 500, 42).unwrap();
        let b = generate_observations(&hmm, 500, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.states.len(), 500);
        assert!(a.states.iter().all(|&s| s < 2));
        assert!(a.observations.iter().all(|&o| o < 6));

        let c = generate_observations(&hmm, 500, 43).unwrap();
        assert_ne!(a.observations, c.observations);
    }

    #[test]
    fn test_deterministic_model() {
        let hmm = HiddenMarkovModel::new(
            vec![0.0, 1.0],
            vec![vec![0.0, 1.0], vec![1.0, 0.0]],
            vec![vec![1.0, 0.0, 0.0], vec![0.0, 0.0, 1.0]],
        )
        .unwrap();
        let sequence = generate_observations(&hmm, 5, 7).unwrap();
        assert_eq!(sequence.states, vec![1, 0, 1, 0, 1]);
        assert_eq!(sequence.observations, vec![2, 0, 2, 0, 2]);
    }

    #[test]
    fn test_zero_length() {
        let sequence = generate_observations(&loaded_die(), 0, 1).unwrap();
        assert!(sequence.is_empty());
        assert!(sequence.states.is_empty());
    }

    #[test]
    fn test_invalid_row() {
        let hmm = HiddenMarkovModel::new(
            vec![0.5, 0.5],
            vec![vec![0.5, 0.5], vec![0.0, 0.0]],
            vec![vec![1.0], vec![1.0]],
        )
        .unwrap();
        match generate_observations(&hmm, 10, 3) {
            Err(HmmError::InvalidDistribution(msg)) => assert!(msg.contains("transition row 1")),
            other => panic!("expected invalid distribution, got {:?}", other),
        }
    }

    #[test]
    fn test_unreachable_zero_row_rejected() {
        // state 1 is never entered but its emission row is still checked
        let hmm = HiddenMarkovModel::new(
            vec![1.0, 0.0],
            vec![vec![1.0, 0.0], vec![0.5, 0.5]],
            vec![vec![0.5, 0.5], vec![0.0, 0.0]],
        )
        .unwrap();
        match generate_observations(&hmm, 10, 3) {
            Err(HmmError::InvalidDistribution(msg)) => assert!(msg.contains("emission row 1")),
            other => panic!("expected invalid distribution, got {:?}", other),
        }
        assert!(generate_observations(&hmm, 0, 3).unwrap().is_empty());
    }

    #[test]
    fn test_labeled_sampling() {
        let hmm = loaded_die();
        let states = LabelSpace::new(vec!['F', 'L']).unwrap();
        let symbols = LabelSpace::new(vec!["1", "2", "3", "4", "5", "6"]).unwrap();
        let (truth, rolls) = generate_labeled(&hmm, &states, &symbols, 300, 515).unwrap();
        assert_eq!(truth.len(), 300);
        assert_eq!(rolls.len(), 300);
        assert!(truth.iter().all(|s| *s == 'F' || *s == 'L'));

        let sequence = generate_observations(&hmm, 300, 515).unwrap();
        assert_eq!(symbols.indices(&rolls).unwrap(), sequence.observations);

        let wrong = LabelSpace::new(vec!["1", "2"]).unwrap();
        assert!(generate_labeled(&hmm, &states, &wrong, 3, 1).is_err());
    }
}
