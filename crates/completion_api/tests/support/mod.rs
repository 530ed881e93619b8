#![allow(dead_code)]

// Shared with the cas_auth integration tests.
#[path = "../../../cas_auth/tests/support/mod.rs"]
mod server;

pub mod client;

pub use server::*;
