//! Memory bridge implementations for RecallSift.
//!
//! The production bridge talks to the observation store and lives with the
//! embedding application. These two cover tests and store-less sessions.

pub mod in_memory;
pub mod noop;

pub use in_memory::InMemoryBridge;
pub use noop::NoopBridge;
