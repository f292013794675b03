pub mod audit;
pub mod dashboard;
