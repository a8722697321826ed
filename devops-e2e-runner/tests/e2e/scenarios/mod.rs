//! E2E scenarios, one file per harness behavior.

mod catalog;
mod setup_gate;
