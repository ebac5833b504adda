//! Core modules for the registro record engine.
//!
//! Shared runtime primitives live here: the SQLite layer, the keyed
//! mutation broker, typed errors, configuration, and temporal helpers.

pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod output;
pub mod schemas;
pub mod store;
pub mod time;
