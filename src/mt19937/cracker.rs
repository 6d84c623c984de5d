//! Clone a live MT19937 from 624 consecutive 32-bit outputs.
//!
//! Tempering is a bijection, so each observed draw untempered is exactly one
//! raw state word. 624 consecutive draws therefore hand over the complete
//! state; splicing it into a fresh generator with the index at 624 lines the
//! clone up one twist behind the target, and every draw after that can be
//! predicted or validated.

use crate::cracker::{RandomCracker, SolverStatus};
use crate::error::CrackError;

use super::generator::MtGenerator;
use super::untemper::untemper;
use super::N;

pub struct Mt19937Cracker {
    status: SolverStatus,
    state: Vec<u32>,
    generator: Option<MtGenerator>,
}

impl Mt19937Cracker {
    pub fn new() -> Mt19937Cracker {
        Mt19937Cracker {
            status: SolverStatus::Solving,
            state: Vec::with_capacity(N),
            generator: None,
        }
    }
}

impl Default for Mt19937Cracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomCracker for Mt19937Cracker {
    type Value = u32;

    fn status(&self) -> SolverStatus {
        self.status
    }

    fn add_value(&mut self, value: u32) -> Result<(), CrackError> {
        match self.status {
            SolverStatus::Solving => {
                self.state.push(untemper(value));
                if self.state.len() == N {
                    let state = std::mem::take(&mut self.state);
                    self.generator = Some(MtGenerator::from_state(state, N));
                    self.status = SolverStatus::Solved;
                }
                Ok(())
            }
            SolverStatus::Solved => {
                // Consume the clone's next draw and validate it.
                let generator = self.generator.as_mut().unwrap();
                if generator.gen_uint32() != value {
                    self.status = SolverStatus::NotSolvable;
                    return Err(CrackError::NotSolvable);
                }
                Ok(())
            }
            SolverStatus::NotSolvable => Err(CrackError::NotSolvable),
            _ => unreachable!(),
        }
    }

    fn predict_next(&mut self) -> Result<u32, CrackError> {
        match self.status {
            SolverStatus::Solving => Err(CrackError::NotEnoughData),
            SolverStatus::Solved => Ok(self.generator.as_mut().unwrap().gen_uint32()),
            SolverStatus::NotSolvable => Err(CrackError::NotSolvable),
            _ => unreachable!(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{thread_rng, Rng};

    #[test]
    fn predicts_future_outputs() {
        // Skip an arbitrary prefix first: recovery must not depend on the
        // observation window starting at a twist boundary.
        let mut target = MtGenerator::from_seed(123456789);
        for _ in 0..1234 {
            target.gen_uint32();
        }

        let mut cracker = Mt19937Cracker::new();
        for _ in 0..N {
            assert_eq!(cracker.status(), SolverStatus::Solving);
            cracker.add_value(target.gen_uint32()).unwrap();
        }
        assert_eq!(cracker.status(), SolverStatus::Solved);

        for _ in 0..1000 {
            assert_eq!(cracker.predict_next().unwrap(), target.gen_uint32());
        }
    }

    #[test]
    fn validates_values_after_solving() {
        let mut rng = thread_rng();
        let mut target = MtGenerator::from_seed(rng.gen::<u32>() as i64);
        let mut cracker = Mt19937Cracker::new();
        for _ in 0..N {
            cracker.add_value(target.gen_uint32()).unwrap();
        }
        // Matching values keep the solver alive.
        for _ in 0..100 {
            cracker.add_value(target.gen_uint32()).unwrap();
        }
        assert_eq!(cracker.status(), SolverStatus::Solved);
    }

    #[test]
    fn predict_before_solve_needs_more_data() {
        let mut cracker = Mt19937Cracker::new();
        assert_eq!(cracker.predict_next(), Err(CrackError::NotEnoughData));
        assert_eq!(cracker.status(), SolverStatus::Solving);
    }

    #[test]
    fn contradiction_is_terminal_and_idempotent() {
        let mut cracker = Mt19937Cracker::new();
        for _ in 0..N {
            cracker.add_value(0).unwrap();
        }
        // The all-zero state generates tempered zeros forever, so a 1 can
        // never follow 624 zeros.
        assert_eq!(cracker.add_value(1), Err(CrackError::NotSolvable));
        assert_eq!(cracker.status(), SolverStatus::NotSolvable);

        assert_eq!(cracker.predict_next(), Err(CrackError::NotSolvable));
        assert_eq!(cracker.status(), SolverStatus::NotSolvable);

        assert_eq!(cracker.add_value(0), Err(CrackError::NotSolvable));
        assert_eq!(cracker.status(), SolverStatus::NotSolvable);
    }
}
