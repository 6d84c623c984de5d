//! V8's `Math.random()` stack: the xorshift128+ generator, the two
//! historical state-to-double conversions, and the incremental solver that
//! recovers the state through the engine's 64-entry LIFO output cache.

pub mod converter;
pub mod cracker;
pub mod xorshift128;

pub use converter::{BinaryCastConverter, Converter, DivisionConverter};
pub use cracker::{V8Cracker, V8IntCracker, V8LegacyCracker, V8RandomCracker};
pub use xorshift128::XorShift128;
