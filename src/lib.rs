//! chartquery - a scoped, fan-out safe analytical query engine
//!
//! Compiles declarative chart and report definitions into read-only plans
//! over a typed entity catalog, and runs them against a storage backend.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod decorator;
pub mod engine;
pub mod executor;
pub mod model;
pub mod observability;
pub mod planner;
pub mod scope;
pub mod sort;
