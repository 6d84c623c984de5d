//! Recover the internal state of everyday non-cryptographic PRNGs from
//! their outputs, then predict everything they will ever emit.
//!
//! Two generator families are covered:
//!
//! - MT19937 as used by CPython's `random` module, recovered either
//!   algebraically from 624 raw 32-bit draws (tempering is invertible) or
//!   symbolically from `random()` floats, which expose only 53 of every 64
//!   state bits.
//! - xorshift128+ as used by V8 behind `Math.random()`, recovered through
//!   the engine's 64-entry LIFO output cache, including refills landing
//!   mid-observation and both historical float encodings.
//!
//! The symbolic solvers run on an exact GF(2) linear engine ([`gf2`]): every
//! constraint these generators give rise to is an XOR of state bits, so
//! satisfiability and model extraction are plain linear algebra.
//!
//! Entry points: [`Cracker::create`] for runtime-selected generators, or the
//! concrete solvers in [`mt19937`] and [`v8`] when the generator is known
//! statically.

pub mod cracker;
pub mod error;
pub mod gf2;
pub mod mt19937;
pub mod v8;

pub use cracker::{Cracker, RandomCracker, RngType, SolverStatus, Value};
pub use error::CrackError;
