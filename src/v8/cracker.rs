//! Incremental recovery of V8's `Math.random()` state.
//!
//! The engine batches its randomness: when its 64-entry cache runs dry it
//! advances xorshift128+ 64 times, stashes the converted `s0` of every step,
//! and then serves the stash back in reverse. An observer therefore sees
//! values in reverse generation order, starting at an unknown depth into
//! some batch, and a refill can land in the middle of the observation
//! window.
//!
//! The solver keeps two symbolic words for the state that produced the most
//! recently observed value. Each observation asserts the converter's known
//! bits against `S0`, then rewinds the pair one step, so the next (older)
//! observation constrains the right state. Alongside runs a concrete
//! candidate: the model of the rewound pair, i.e. the producer of the next
//! expected pop. Once the candidate starts matching observations outright
//! the state is pinned; one confirmed refill alignment later the solver
//! trusts itself across refills too, simulating each one as 128 forward
//! steps (64 skipped pops of the old batch plus 64 freshly generated).

use std::marker::PhantomData;

use crate::cracker::{RandomCracker, SolverStatus};
use crate::error::CrackError;
use crate::gf2::{CheckResult, SymWord, System};

use super::converter::{Converter, DivisionConverter};
use super::xorshift128::{next_state, previous_state};

/// Entries in the engine's output cache.
pub const CACHE_REFILL_SIZE: usize = 64;

/// Symbolic columns: `s0` occupies 0..64, `s1` 64..128.
const STATE_BITS: usize = 128;

/// How one kind of observed value talks to the solver: what the candidate
/// state predicts, and which state bits an observation pins down.
pub trait V8Observations {
    type Value: Copy + PartialEq;

    fn predict(&self, s0: u64) -> Self::Value;

    fn constrain(&self, system: &mut System, s0_sym: &SymWord, value: Self::Value);
}

/// Raw `Math.random()` doubles: one observation fixes the converter's
/// non-ignored bits of `s0` exactly.
pub struct DoubleObservations<C: Converter> {
    _converter: PhantomData<C>,
}

impl<C: Converter> DoubleObservations<C> {
    pub fn new() -> Self {
        DoubleObservations {
            _converter: PhantomData,
        }
    }
}

impl<C: Converter> Default for DoubleObservations<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Converter> V8Observations for DoubleObservations<C> {
    type Value = f64;

    fn predict(&self, s0: u64) -> f64 {
        C::to_double(s0)
    }

    fn constrain(&self, system: &mut System, s0_sym: &SymWord, value: f64) {
        let shift = C::IGNORED_LOWER_BITS as usize;
        let known = C::from_double(value) >> shift;
        system.assert_bits(s0_sym, shift, 64, known);
    }
}

/// `floor(Math.random() * multiplier)` projections. An integer `n` only
/// brackets the double into `[n/M, (n+1)/M)`, so the usable bits are the
/// shared prefix of the two bracket states, an amount that varies per
/// observation.
pub struct IntObservations<C: Converter> {
    multiplier: u64,
    _converter: PhantomData<C>,
}

impl<C: Converter> IntObservations<C> {
    pub fn new(multiplier: u64) -> Self {
        IntObservations {
            multiplier,
            _converter: PhantomData,
        }
    }
}

impl<C: Converter> V8Observations for IntObservations<C> {
    type Value = u64;

    fn predict(&self, s0: u64) -> u64 {
        (C::to_double(s0) * self.multiplier as f64) as u64
    }

    fn constrain(&self, system: &mut System, s0_sym: &SymWord, value: u64) {
        let lower = C::from_double(value as f64 / self.multiplier as f64);
        let upper = C::from_double((value + 1) as f64 / self.multiplier as f64);
        let mut shift = C::IGNORED_LOWER_BITS as usize;
        while shift < 64 && (lower >> shift) != (upper >> shift) {
            shift += 1;
        }
        if shift < 64 {
            system.assert_bits(s0_sym, shift, 64, lower >> shift);
        }
    }
}

pub struct V8Cracker<O: V8Observations> {
    status: SolverStatus,
    observations: O,
    system: System,
    s0_sym: SymWord,
    s1_sym: SymWord,
    s0_val: u64,
    s1_val: u64,
    cache_refill_counter: usize,
    observed: Vec<O::Value>,
}

/// Modern V8 (division conversion).
pub type V8RandomCracker = V8Cracker<DoubleObservations<DivisionConverter>>;
/// Older V8 (binary-cast conversion).
pub type V8LegacyCracker = V8Cracker<DoubleObservations<super::converter::BinaryCastConverter>>;
/// Integer projections of modern V8 output.
pub type V8IntCracker = V8Cracker<IntObservations<DivisionConverter>>;

impl<C: Converter> V8Cracker<DoubleObservations<C>> {
    pub fn new() -> Self {
        Self::with_observations(DoubleObservations::new())
    }
}

impl<C: Converter> Default for V8Cracker<DoubleObservations<C>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Converter> V8Cracker<IntObservations<C>> {
    pub fn with_multiplier(multiplier: u64) -> Self {
        Self::with_observations(IntObservations::new(multiplier))
    }
}

impl<O: V8Observations> V8Cracker<O> {
    pub fn with_observations(observations: O) -> Self {
        V8Cracker {
            status: SolverStatus::Solving,
            observations,
            system: System::new(STATE_BITS),
            s0_sym: SymWord::vars(0, 64),
            s1_sym: SymWord::vars(64, 64),
            s0_val: 0,
            s1_val: 0,
            cache_refill_counter: 0,
            observed: Vec::new(),
        }
    }

    /// The candidate's value for the next expected pop.
    fn peek_next_prediction(&self) -> O::Value {
        self.observations.predict(self.s0_val)
    }

    fn prediction_matches(&self, value: O::Value) -> bool {
        self.peek_next_prediction() == value
    }

    /// Rewind the candidate: pops arrive in reverse generation order.
    fn rotate_state(&mut self) {
        (self.s0_val, self.s1_val) = previous_state(self.s0_val, self.s1_val);
    }

    /// Assert an observation against the current symbolic `S0`, then rewind
    /// the symbolic pair so the next observation lands on the right state.
    /// The rewind is the closed-form inverse spelled in xor/shift terms; no
    /// fresh columns are ever introduced.
    fn add_constraint(&mut self, value: O::Value) {
        self.observations
            .constrain(&mut self.system, &self.s0_sym, value);
        let s1_prev = self.s0_sym.clone();
        let t = self.s1_sym.xor(&s1_prev).xor(&s1_prev.shr(26));
        let t = t.xor(&t.shr(17)).xor(&t.shr(34)).xor(&t.shr(51));
        let s0_prev = t.xor(&t.shl(23)).xor(&t.shl(46));
        self.s0_sym = s0_prev;
        self.s1_sym = s1_prev;
    }

    /// Drop the oldest observation: rebuild the system and replay the rest.
    /// One constraint plus one rewind per remaining observation, linear in
    /// the buffer.
    fn drop_oldest_observation(&mut self) {
        self.observed.remove(0);
        self.system = System::new(STATE_BITS);
        self.s0_sym = SymWord::vars(0, 64);
        self.s1_sym = SymWord::vars(64, 64);
        let remaining = self.observed.clone();
        for value in remaining {
            self.add_constraint(value);
        }
    }

    fn update_state_from_model(&mut self) {
        if let Some(assign) = self.system.solve() {
            self.s0_val = self.s0_sym.eval(&assign);
            self.s1_val = self.s1_sym.eval(&assign);
        }
    }

    /// Simulate a refill: 64 pops of the old batch we will never see plus
    /// the 64 states generated for the new one; the next pop is the last of
    /// those.
    fn compensate_cache_refill(&mut self) {
        for _ in 0..2 * CACHE_REFILL_SIZE {
            (self.s0_val, self.s1_val) = next_state(self.s0_val, self.s1_val);
        }
        self.cache_refill_counter = CACHE_REFILL_SIZE;
    }

    fn on_solving(&mut self, value: O::Value) -> Result<(), CrackError> {
        if self.prediction_matches(value) {
            self.rotate_state();
            self.status = SolverStatus::SolvedBeforeCacheRefill;
            return Ok(());
        }
        self.add_constraint(value);
        if self.system.check() == CheckResult::Unsat {
            self.status = SolverStatus::CacheRefilledWhileSolving;
            return Ok(());
        }
        self.update_state_from_model();
        Ok(())
    }

    fn on_cache_refilled_while_solving(&mut self, value: O::Value) -> Result<(), CrackError> {
        if self.prediction_matches(value) {
            self.rotate_state();
            // Everything still buffered was popped since the refill began.
            self.cache_refill_counter =
                CACHE_REFILL_SIZE - self.observed.len().min(CACHE_REFILL_SIZE) + 1;
            self.status = SolverStatus::Solved;
            return Ok(());
        }
        self.add_constraint(value);
        while self.system.check() == CheckResult::Unsat {
            self.drop_oldest_observation();
        }
        self.update_state_from_model();
        Ok(())
    }

    fn on_solved_before_cache_refill(&mut self, value: O::Value) -> Result<(), CrackError> {
        if self.prediction_matches(value) {
            self.rotate_state();
            return Ok(());
        }
        // First mismatch after a confirmed candidate: assume the cache just
        // refilled and re-check once.
        self.compensate_cache_refill();
        self.status = SolverStatus::Solved;
        if !self.prediction_matches(value) {
            self.status = SolverStatus::NotSolvable;
            return Err(CrackError::NotSolvable);
        }
        self.rotate_state();
        Ok(())
    }

    fn on_solved(&mut self, value: O::Value) -> Result<(), CrackError> {
        self.cache_refill_counter -= 1;
        if self.cache_refill_counter == 0 {
            self.compensate_cache_refill();
        }
        if self.prediction_matches(value) {
            self.rotate_state();
            Ok(())
        } else {
            self.status = SolverStatus::NotSolvable;
            Err(CrackError::NotSolvable)
        }
    }
}

impl<O: V8Observations> RandomCracker for V8Cracker<O> {
    type Value = O::Value;

    fn status(&self) -> SolverStatus {
        self.status
    }

    fn add_value(&mut self, value: O::Value) -> Result<(), CrackError> {
        self.observed.push(value);
        match self.status {
            SolverStatus::Solving => self.on_solving(value),
            SolverStatus::CacheRefilledWhileSolving => {
                self.on_cache_refilled_while_solving(value)
            }
            SolverStatus::SolvedBeforeCacheRefill => self.on_solved_before_cache_refill(value),
            SolverStatus::Solved => self.on_solved(value),
            SolverStatus::NotSolvable => Err(CrackError::NotSolvable),
        }
    }

    fn predict_next(&mut self) -> Result<O::Value, CrackError> {
        match self.status {
            SolverStatus::Solving | SolverStatus::CacheRefilledWhileSolving => {
                Err(CrackError::NotEnoughData)
            }
            SolverStatus::SolvedBeforeCacheRefill => {
                let result = self.peek_next_prediction();
                self.rotate_state();
                Ok(result)
            }
            SolverStatus::Solved => {
                self.cache_refill_counter -= 1;
                if self.cache_refill_counter == 0 {
                    self.compensate_cache_refill();
                }
                let result = self.peek_next_prediction();
                self.rotate_state();
                Ok(result)
            }
            SolverStatus::NotSolvable => Err(CrackError::NotSolvable),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::v8::xorshift128::XorShift128;
    use rand::{thread_rng, Rng};

    // Known old-V8 sequence (binary-cast conversion).
    const LEGACY_OBSERVED: [f64; 5] = [
        0.7059645842555349,
        0.08792663094382847,
        0.7988851586045023,
        0.336854523159821,
        0.07712871255601494,
    ];
    const LEGACY_EXPECTED: [f64; 5] = [
        0.21292322268831865,
        0.6202035825575369,
        0.3622407861913677,
        0.08293436061131909,
        0.5464511822883438,
    ];

    // Known modern-V8 sequence (division conversion).
    const MODERN_OBSERVED: [f64; 5] = [
        0.4835242132442181,
        0.750646567782529,
        0.544701479644019,
        0.4982632644639161,
        0.19140133448030294,
    ];
    const MODERN_EXPECTED: [f64; 5] = [
        0.9205346875124655,
        0.5470430065705328,
        0.5253121712480878,
        0.09078515940278675,
        0.2487362245629754,
    ];

    // A modern-V8 run long enough to carve observations and integer
    // projections out of.
    const INT_SEQUENCE: [f64; 20] = [
        0.14125615467524433,
        0.26338755919900825,
        0.35195985313880274,
        0.017540229969875143,
        0.9709689202550907,
        0.6878379941821865,
        0.26971805726378495,
        0.7918168602898303,
        0.870242991224168,
        0.7266674854224073,
        0.02669613161449602,
        0.7837415283729079,
        0.3205086721472562,
        0.5516568532161495,
        0.21067570655396728,
        0.4171358133289702,
        0.5267603220387562,
        0.19739876622115204,
        0.5044790755285522,
        0.7527406751741436,
    ];

    #[test]
    fn cracks_the_legacy_sequence() {
        let mut cracker = V8LegacyCracker::new();
        for &value in &LEGACY_OBSERVED {
            cracker.add_value(value).unwrap();
        }
        assert_eq!(cracker.status(), SolverStatus::SolvedBeforeCacheRefill);
        for &expected in &LEGACY_EXPECTED {
            assert_eq!(cracker.predict_next().unwrap(), expected);
        }
    }

    #[test]
    fn cracks_the_modern_sequence() {
        let mut cracker = V8RandomCracker::new();
        for &value in &MODERN_OBSERVED {
            cracker.add_value(value).unwrap();
        }
        assert_eq!(cracker.status(), SolverStatus::SolvedBeforeCacheRefill);
        for &expected in &MODERN_EXPECTED {
            assert_eq!(cracker.predict_next().unwrap(), expected);
        }
    }

    #[test]
    fn cracks_integer_projections() {
        let multiplier = 1u64 << 32;
        let observed: Vec<u64> = INT_SEQUENCE[..16]
            .iter()
            .map(|v| (v * multiplier as f64) as u64)
            .collect();
        let expected: Vec<u64> = INT_SEQUENCE[16..]
            .iter()
            .map(|v| (v * multiplier as f64) as u64)
            .collect();

        let mut cracker = V8IntCracker::with_multiplier(multiplier);
        for &value in &observed {
            cracker.add_value(value).unwrap();
        }
        assert_eq!(cracker.status(), SolverStatus::SolvedBeforeCacheRefill);
        for &value in &expected {
            assert_eq!(cracker.predict_next().unwrap(), value);
        }
    }

    #[test]
    fn predict_needs_data_while_solving() {
        let mut cracker = V8RandomCracker::new();
        assert_eq!(cracker.predict_next(), Err(CrackError::NotEnoughData));
        cracker.add_value(0.123456).unwrap();
        assert_eq!(cracker.predict_next(), Err(CrackError::NotEnoughData));
    }

    /// The engine's cache, bit for bit: a dry cache triggers 64 state
    /// advances, and values drain newest-first.
    struct CachedEngine<C: Converter> {
        gen: XorShift128,
        cache: Vec<f64>,
        _converter: PhantomData<C>,
    }

    impl<C: Converter> CachedEngine<C> {
        fn new(gen: XorShift128) -> Self {
            CachedEngine {
                gen,
                cache: Vec::new(),
                _converter: PhantomData,
            }
        }

        fn random(&mut self) -> f64 {
            if self.cache.is_empty() {
                for _ in 0..CACHE_REFILL_SIZE {
                    let s0 = self.gen.step();
                    self.cache.push(C::to_double(s0));
                }
            }
            self.cache.pop().unwrap()
        }
    }

    fn live_run<C: Converter>(cracker: &mut V8Cracker<DoubleObservations<C>>, phase: usize) {
        let mut rng = thread_rng();
        let mut engine =
            CachedEngine::<C>::new(XorShift128::new(rng.gen::<u64>() | 1, rng.gen()));
        // Start observing at an arbitrary depth into a batch.
        for _ in 0..phase {
            engine.random();
        }
        for _ in 0..1000 {
            cracker.add_value(engine.random()).unwrap();
        }
        assert_eq!(cracker.status(), SolverStatus::Solved);
        // Predictions keep tracking the engine across further refills.
        for i in 0..300 {
            assert_eq!(
                cracker.predict_next().unwrap(),
                engine.random(),
                "prediction diverged at offset {i}"
            );
        }
    }

    #[test]
    fn survives_cache_refills_modern() {
        for phase in [0, 1, 17, 37, 62, 63] {
            let mut cracker = V8RandomCracker::new();
            live_run(&mut cracker, phase);
        }
    }

    #[test]
    fn survives_cache_refills_legacy() {
        for phase in [0, 13, 63] {
            let mut cracker = V8LegacyCracker::new();
            live_run(&mut cracker, phase);
        }
    }

    #[test]
    fn mismatch_after_solving_is_terminal() {
        let mut cracker = V8RandomCracker::new();
        for &value in &MODERN_OBSERVED {
            cracker.add_value(value).unwrap();
        }
        // A value the pinned state cannot produce: the refill compensation
        // fires once, fails to explain it, and the solver dies.
        assert_eq!(cracker.add_value(0.5), Err(CrackError::NotSolvable));
        assert_eq!(cracker.status(), SolverStatus::NotSolvable);
        assert_eq!(cracker.predict_next(), Err(CrackError::NotSolvable));
        assert_eq!(cracker.add_value(0.5), Err(CrackError::NotSolvable));
        assert_eq!(cracker.status(), SolverStatus::NotSolvable);
    }
}
