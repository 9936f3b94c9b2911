//! Viterbi decoding and Viterbi training for discrete hidden Markov models.
//!
//! - [`Decoder`] finds the most probable hidden-state path for an observation
//!   sequence, in log space or with raw probabilities.
//! - [`ViterbiTrainer`] alternates decoding and frequency-count
//!   re-estimation of the transition and emission matrices until the decoded
//!   path's probability settles.
//! - [`LabelSpace`] maps symbolic state and observation labels to matrix
//!   indices and back.
//! - [`generate_observations`] samples test data from a model with a fixed seed.
//!
//! ```
//! use viterbi_hmm::{viterbi, HiddenMarkovModel, LabelSpace};
//!
//! let hmm = HiddenMarkovModel::new(
//!     vec![0.9999, 0.0001],
//!     vec![vec![0.95, 0.05], vec![0.10, 0.90]],
//!     vec![vec![1.0 / 6.0; 6], vec![0.1, 0.1, 0.1, 0.1, 0.1, 0.5]],
//! )
//! .unwrap();
//! let states = LabelSpace::new(vec!['F', 'L']).unwrap();
//! let symbols = LabelSpace::new(vec!['1', '2', '3', '4', '5', '6']).unwrap();
//!
//! let rolls: Vec<char> = "1526666666663".chars().collect();
//! let path = viterbi(&hmm, &symbols.indices(&rolls).unwrap()).unwrap();
//! let labels: String = path.relabel(&states).unwrap().into_iter().collect();
//! assert_eq!(labels, "FFFLLLLLLLLLL");
//! ```

pub mod error;
pub mod hmm;

pub use error::{HmmError, Result};
pub use hmm::*;
