// Shared test support code for scenario tests.
// Fakes journal every call so tests can assert ordering.

pub mod common;
pub mod journal;
pub mod registry;
pub mod service;

pub use common::*;
pub use journal::Journal;
pub use registry::FakeRegistry;
pub use service::{Behavior, Faults, RecordingService};
