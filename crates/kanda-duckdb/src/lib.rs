pub mod analytics_impl;
pub mod auth;
pub mod backend;
pub mod leads;
pub mod metadata_impl;
pub mod queries;
pub mod schema;
pub mod session;
pub mod tracking;

pub use backend::DuckDbBackend;

/// Re-export the `duckdb` crate so consumers (especially tests) can use
/// `kanda_duckdb::duckdb::params!` without an extra dependency.
pub use duckdb;
