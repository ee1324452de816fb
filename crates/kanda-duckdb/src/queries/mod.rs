pub mod breakdowns;
pub mod engagement;
pub mod report;
pub mod summary;
