//! MT19937 as shipped in CPython's `random` module: the generator itself,
//! the tempering inverse, and two state-recovery solvers (one algebraic,
//! from raw 32-bit draws; one symbolic, from 53-bit floats).

pub mod cracker;
pub mod float_cracker;
pub mod generator;
pub mod untemper;

pub use cracker::Mt19937Cracker;
pub use float_cracker::{crack_from_doubles, MtFloatCracker};
pub use generator::MtGenerator;
pub use untemper::{temper, untemper};

// Core MT19937 parameters, shared by the generator and both solvers.
pub const N: usize = 624;
pub const M: usize = 397;
pub const MATRIX_A: u32 = 0x9908_B0DF;
pub const UPPER_MASK: u32 = 0x8000_0000;
pub const LOWER_MASK: u32 = 0x7FFF_FFFF;

// Tempering parameters.
pub const TEMPERING_U: u32 = 11;
pub const TEMPERING_D: u32 = 0xFFFF_FFFF;
pub const TEMPERING_S: u32 = 7;
pub const TEMPERING_B: u32 = 0x9D2C_5680;
pub const TEMPERING_T: u32 = 15;
pub const TEMPERING_C: u32 = 0xEFC6_0000;
pub const TEMPERING_L: u32 = 18;

// 53-bit float derivation: (a * 2^26 + b) / 2^53, matching CPython's
// random_random to the last bit.
pub const RANDOM_SHIFT_A: u32 = 5;
pub const RANDOM_SHIFT_B: u32 = 6;
pub const RANDOM_MULTIPLIER: f64 = 67108864.0;
pub const RANDOM_DIVISOR: f64 = 9007199254740992.0;
