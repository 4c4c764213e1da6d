pub mod db;

pub mod constants;
pub mod errors;
pub mod market_data;
pub mod performance;
pub mod portfolios;
pub mod schema;
pub mod snapshots;
pub mod splits;
pub mod transactions;

pub use errors::{Error, Result};
