pub mod analytics;
pub mod config;
pub mod error;
pub mod event;
pub mod geo;
pub mod lead;
pub mod referrer;
pub mod session;
