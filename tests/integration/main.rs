//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the host simulation adapters and the mocks in `mock_hw`.  All
//! tests run on the host (x86_64) with no real hardware required.

#![cfg(not(target_os = "espidf"))]

mod bootstrap_tests;
mod bridge_tests;
mod mock_hw;
mod settings_tests;
