//! The common solver contract and the factory that hands out solvers by
//! generator type.

use std::fmt;

use crate::error::CrackError;
use crate::mt19937::Mt19937Cracker;
use crate::v8::{V8IntCracker, V8LegacyCracker, V8RandomCracker};

/// Which pseudo-random generator produced the observed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RngType {
    /// Modern V8 `Math.random()` (division conversion).
    V8,
    /// Older V8 `Math.random()` (binary-cast conversion).
    V8Legacy,
    /// Integer projections `floor(Math.random() * multiplier)` of modern V8.
    V8Int,
    /// CPython's `random` module (MT19937).
    Mt19937,
}

/// Where a solver stands with respect to the values it has seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// Needs more values to determine the generator's state.
    Solving,
    /// State determined and confirmed against the live generator;
    /// predictions survive cache refills.
    Solved,
    /// V8 only: a candidate state matches all observations, but no cache
    /// refill has confirmed the alignment yet.
    SolvedBeforeCacheRefill,
    /// V8 only: a refill straddled the observation window; the solver is
    /// discarding the oldest observations until the rest are consistent.
    CacheRefilledWhileSolving,
    /// The observations contradict every possible state. Terminal.
    NotSolvable,
}

/// The incremental contract every solver implements: feed observed values
/// one at a time, watch the status, and ask for predictions once solved.
pub trait RandomCracker {
    type Value;

    fn status(&self) -> SolverStatus;

    fn add_value(&mut self, value: Self::Value) -> Result<(), CrackError>;

    fn predict_next(&mut self) -> Result<Self::Value, CrackError>;
}

/// A tagged observation or prediction, for callers that pick the generator
/// at runtime. V8 and V8_LEGACY speak doubles; V8_INT and MT19937 speak
/// integers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Double(f64),
    Int(u64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Double(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
        }
    }
}

/// A solver for any supported generator, dispatching the common contract
/// over tagged values.
pub enum Cracker {
    V8(V8RandomCracker),
    V8Legacy(V8LegacyCracker),
    V8Int(V8IntCracker),
    Mt19937(Mt19937Cracker),
}

impl Cracker {
    /// Build a solver for `rng_type`. `multiplier` is required for
    /// [`RngType::V8Int`] and ignored otherwise.
    pub fn create(rng_type: RngType, multiplier: Option<u64>) -> Result<Cracker, CrackError> {
        match rng_type {
            RngType::V8 => Ok(Cracker::V8(V8RandomCracker::new())),
            RngType::V8Legacy => Ok(Cracker::V8Legacy(V8LegacyCracker::new())),
            RngType::V8Int => {
                let multiplier = multiplier.ok_or_else(|| {
                    CrackError::InvalidArgument("V8_INT requires a multiplier".into())
                })?;
                if multiplier == 0 {
                    return Err(CrackError::InvalidArgument(
                        "multiplier must be positive".into(),
                    ));
                }
                Ok(Cracker::V8Int(V8IntCracker::with_multiplier(multiplier)))
            }
            RngType::Mt19937 => Ok(Cracker::Mt19937(Mt19937Cracker::new())),
        }
    }

    pub fn status(&self) -> SolverStatus {
        match self {
            Cracker::V8(c) => c.status(),
            Cracker::V8Legacy(c) => c.status(),
            Cracker::V8Int(c) => c.status(),
            Cracker::Mt19937(c) => c.status(),
        }
    }

    pub fn add_value(&mut self, value: Value) -> Result<(), CrackError> {
        match (self, value) {
            (Cracker::V8(c), Value::Double(v)) => c.add_value(v),
            (Cracker::V8Legacy(c), Value::Double(v)) => c.add_value(v),
            (Cracker::V8Int(c), Value::Int(v)) => c.add_value(v),
            (Cracker::Mt19937(c), Value::Int(v)) => {
                let v = u32::try_from(v).map_err(|_| {
                    CrackError::InvalidArgument("MT19937 outputs are 32-bit values".into())
                })?;
                c.add_value(v)
            }
            _ => Err(CrackError::InvalidArgument(
                "value type does not match the generator".into(),
            )),
        }
    }

    pub fn predict_next(&mut self) -> Result<Value, CrackError> {
        match self {
            Cracker::V8(c) => c.predict_next().map(Value::Double),
            Cracker::V8Legacy(c) => c.predict_next().map(Value::Double),
            Cracker::V8Int(c) => c.predict_next().map(Value::Int),
            Cracker::Mt19937(c) => c.predict_next().map(|v| Value::Int(v as u64)),
        }
    }
}
