pub mod catalog;
pub mod cli;
pub mod coercion;
pub mod config;
pub mod context;
pub mod data_types;
pub mod repository;
pub mod schema;
