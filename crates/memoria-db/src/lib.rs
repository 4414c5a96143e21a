//! Memoria database layer
//!
//! Postgres repositories and the unit of work used by the services crate.

pub mod db;

pub use db::*;
