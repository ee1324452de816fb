pub mod analytics;
pub mod health;
pub mod leads;
pub mod track;
