// Library for tests to access modules

pub mod aggregator;
pub mod backend;
pub mod change;
pub mod classify;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod scheduler;
pub mod store;
pub mod version;
