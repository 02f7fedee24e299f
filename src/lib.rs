// Library for tests to access modules

pub mod aggregation_worker;
pub mod aggregator;
pub mod config;
pub mod error;
pub mod models;
pub mod parser;
pub mod routes;
pub mod snapshot_store;
