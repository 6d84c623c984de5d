use thiserror::Error;

/// Everything a solver can report to its caller.
///
/// Kernels (generators, converters, the linear engine) are total functions
/// and never fail; only the solver drivers and the factory produce these.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CrackError {
    /// Prediction was requested before the state was pinned down. Feed more
    /// observed values and try again.
    #[error("Not enough data to predict.")]
    NotEnoughData,

    /// The observations contradict every possible generator state. Terminal:
    /// the solver stays in this state and keeps returning this error.
    #[error("The PRNG state is not solvable with the given values.")]
    NotSolvable,

    /// Factory or dispatch misuse: unknown generator, missing multiplier,
    /// value of the wrong type or range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
