// lib.rs: Frugal/Thrift IDL workspace intelligence.
//
// The binary entry point lives in main.rs and drives `backend`. The core
// (document store, dependency graph, symbol index) is usable on its own
// through `state::WorldState`.

pub mod backend;
pub mod config;
pub mod cross_file;
pub mod diagnostics;
pub mod document_store;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod state;
pub mod symbol_index;
pub mod symbols;
pub mod syntax;
// test_utils is available in test builds and when the `test-support` feature is enabled.
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod utf16;
