pub mod app;
pub mod auth;
pub mod enrich;
pub mod error;
pub mod geo;
pub mod routes;
pub mod state;
