//! Recover MT19937 from `random()` floats instead of raw draws.
//!
//! Each float exposes only 53 of the 64 bits behind it (27 from the first
//! draw, 26 from the second), so no single window of observations can be
//! untempered directly. But tempering and the twist are both linear over
//! GF(2), and the raw word stream obeys the 624-term twist recurrence at
//! every offset. Modeling the first 624 observed words as unknowns, every
//! later word as a recurrence combination of them, and every observed float
//! as 53 asserted bits yields a linear system whose solution is the state.
//!
//! One subtlety drives the observation count: a float observed inside the
//! first 624 words constrains those words directly, but the five-or-six
//! low tempered bits per word stay free until that word also appears inside
//! a twist constraint. Only once every unknown word has been fed through
//! the recurrence, which takes 624 floats (1248 words), does the system pin
//! every output-relevant bit. The handful of dimensions still free at that
//! point, the low bits of the oldest word, never influence any future
//! output; the model sets them to zero.

use crate::cracker::{RandomCracker, SolverStatus};
use crate::error::CrackError;
use crate::gf2::{SymWord, System};

use super::generator::MtGenerator;
use super::{
    LOWER_MASK, M, MATRIX_A, N, RANDOM_DIVISOR, RANDOM_SHIFT_A, RANDOM_SHIFT_B, TEMPERING_B,
    TEMPERING_C, TEMPERING_D, TEMPERING_L, TEMPERING_S, TEMPERING_T, TEMPERING_U, UPPER_MASK,
};

/// Floats needed before the system determines every output-relevant bit.
pub const MIN_OBSERVATIONS: usize = N;

/// Tempering applied to a symbolic 32-bit word.
fn temper_symbolic(word: &SymWord) -> SymWord {
    let y = word.xor(&word.shr(TEMPERING_U as usize).and_mask(TEMPERING_D as u64));
    let y = y.xor(&y.shl(TEMPERING_S as usize).and_mask(TEMPERING_B as u64));
    let y = y.xor(&y.shl(TEMPERING_T as usize).and_mask(TEMPERING_C as u64));
    y.xor(&y.shr(TEMPERING_L as usize))
}

/// Recover a generator from at least [`MIN_OBSERVATIONS`] consecutive
/// `random()` outputs. The returned clone is installed one twist behind the
/// live generator: its next `gen_double()` is the target's next output.
pub fn crack_from_doubles(observed: &[f64]) -> Result<MtGenerator, CrackError> {
    if observed.len() < MIN_OBSERVATIONS {
        return Err(CrackError::NotEnoughData);
    }

    let total_words = 2 * observed.len();
    let mut system = System::new(N * 32);

    // Raw word stream: the first 624 words are free variables, every later
    // word follows from the twist recurrence.
    let mut words: Vec<SymWord> = Vec::with_capacity(total_words);
    for i in 0..total_words {
        if i < N {
            words.push(SymWord::vars(32 * i, 32));
        } else {
            let y = words[i - N]
                .and_mask(UPPER_MASK as u64)
                .xor(&words[i - N + 1].and_mask(LOWER_MASK as u64));
            let word = words[i - N + M]
                .xor(&y.shr(1))
                .xor(&y.lsb_times(MATRIX_A as u64));
            words.push(word);
        }
    }

    // Each float is round(f * 2^53): the top 27 tempered bits of its first
    // word and the top 26 of its second.
    for (i, &value) in observed.iter().enumerate() {
        let bits = (value * RANDOM_DIVISOR).round() as u64;
        let a = temper_symbolic(&words[2 * i]);
        let b = temper_symbolic(&words[2 * i + 1]);
        system.assert_bits(&a, RANDOM_SHIFT_A as usize, 32, bits >> 26);
        system.assert_bits(&b, RANDOM_SHIFT_B as usize, 32, bits & ((1 << 26) - 1));
    }

    let assign = system.solve().ok_or(CrackError::NotSolvable)?;
    let state = words[total_words - N..]
        .iter()
        .map(|word| word.eval(&assign) as u32)
        .collect();
    Ok(MtGenerator::from_state(state, N))
}

/// Incremental front over [`crack_from_doubles`]: buffers floats while
/// `Solving`, solves once on the 624th, then validates every further
/// observation against the clone.
pub struct MtFloatCracker {
    status: SolverStatus,
    observed: Vec<f64>,
    generator: Option<MtGenerator>,
}

impl MtFloatCracker {
    pub fn new() -> MtFloatCracker {
        MtFloatCracker {
            status: SolverStatus::Solving,
            observed: Vec::with_capacity(MIN_OBSERVATIONS),
            generator: None,
        }
    }
}

impl Default for MtFloatCracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomCracker for MtFloatCracker {
    type Value = f64;

    fn status(&self) -> SolverStatus {
        self.status
    }

    fn add_value(&mut self, value: f64) -> Result<(), CrackError> {
        match self.status {
            SolverStatus::Solving => {
                self.observed.push(value);
                if self.observed.len() == MIN_OBSERVATIONS {
                    match crack_from_doubles(&self.observed) {
                        Ok(generator) => {
                            self.generator = Some(generator);
                            self.observed.clear();
                            self.status = SolverStatus::Solved;
                        }
                        Err(_) => {
                            self.status = SolverStatus::NotSolvable;
                            return Err(CrackError::NotSolvable);
                        }
                    }
                }
                Ok(())
            }
            SolverStatus::Solved => {
                let generator = self.generator.as_mut().unwrap();
                if generator.gen_double() != value {
                    self.status = SolverStatus::NotSolvable;
                    return Err(CrackError::NotSolvable);
                }
                Ok(())
            }
            SolverStatus::NotSolvable => Err(CrackError::NotSolvable),
            _ => unreachable!(),
        }
    }

    fn predict_next(&mut self) -> Result<f64, CrackError> {
        match self.status {
            SolverStatus::Solving => Err(CrackError::NotEnoughData),
            SolverStatus::Solved => Ok(self.generator.as_mut().unwrap().gen_double()),
            SolverStatus::NotSolvable => Err(CrackError::NotSolvable),
            _ => unreachable!(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn batch_crack_predicts_future_doubles() {
        let mut target = MtGenerator::from_seed(445566);
        // Start mid-stream; the recurrence holds at any offset.
        for _ in 0..123 {
            target.gen_double();
        }
        let observed: Vec<f64> = (0..MIN_OBSERVATIONS).map(|_| target.gen_double()).collect();

        let mut clone = crack_from_doubles(&observed).unwrap();
        for i in 0..1000 {
            assert_eq!(
                clone.gen_double(),
                target.gen_double(),
                "prediction diverged at index {i}"
            );
        }
    }

    #[test]
    fn batch_crack_requires_enough_floats() {
        let mut target = MtGenerator::from_seed(7);
        let observed: Vec<f64> = (0..MIN_OBSERVATIONS - 1).map(|_| target.gen_double()).collect();
        assert_eq!(
            crack_from_doubles(&observed).err(),
            Some(CrackError::NotEnoughData)
        );
    }

    #[test]
    fn incremental_cracker_solves_and_validates() {
        let mut target = MtGenerator::from_seed(987654321);
        for _ in 0..55 {
            target.gen_double();
        }

        let mut cracker = MtFloatCracker::new();
        for _ in 0..MIN_OBSERVATIONS {
            assert_eq!(cracker.status(), SolverStatus::Solving);
            cracker.add_value(target.gen_double()).unwrap();
        }
        assert_eq!(cracker.status(), SolverStatus::Solved);

        // Live values keep validating, interleaved with predictions.
        for _ in 0..50 {
            cracker.add_value(target.gen_double()).unwrap();
            assert_eq!(cracker.predict_next().unwrap(), target.gen_double());
        }
        assert_eq!(cracker.status(), SolverStatus::Solved);
    }

    #[test]
    fn predict_before_solve_needs_more_data() {
        let mut cracker = MtFloatCracker::new();
        cracker.add_value(0.5).unwrap();
        assert_eq!(cracker.predict_next(), Err(CrackError::NotEnoughData));
    }
}
