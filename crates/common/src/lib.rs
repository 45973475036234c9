//! # Meridian Common
//!
//! Small shared utilities with no domain knowledge:
//! - [`time`]: clock abstraction with a mock implementation for
//!   deterministic TTL and timestamp tests
//! - [`singleflight`]: keyed async mutexes for collapsing concurrent work
//!   on the same resource into one flight

pub mod singleflight;
pub mod time;

pub use singleflight::KeyedMutex;
pub use time::{Clock, MockClock, SystemClock};
