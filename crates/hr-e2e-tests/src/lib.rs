//! End-to-end routing scenarios.
//!
//! Everything lives under `tests/`; the shared harness is
//! `tests/helpers/mod.rs`.
