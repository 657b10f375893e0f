//! Scenario tests for the orchestrator core.
//!
//! These drive the orchestrator, watch loop and supervisor through journaling
//! fakes and check lifecycle ordering, failure isolation and shutdown order.

mod cases_memory_registry_test;

pub mod support;
