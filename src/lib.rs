// Library for tests to access modules

pub mod aggregation;
pub mod config;
pub mod measurement_repo;
pub mod models;
pub mod probe;
pub mod routes;
pub mod scheduler;
