pub mod decoder;
pub mod generator;
pub mod model;
pub mod space;
pub mod trainer;


// Re-export the decoding and training API with descriptive names
pub use decoder::{log_floor_epsilon, viterbi, Decoder, ProbabilityMode, Trellis, ViterbiPath};
pub use generator::{generate_labeled, generate_observations, ObservationSequence};
pub use model::HiddenMarkovModel;
pub use space::LabelSpace;
pub use trainer::{
    reestimate, TrainingConfig, TrainingResult, ViterbiTrainer, ZeroRowPolicy,
};
