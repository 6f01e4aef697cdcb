//! Database module for SQLite operations.
//!
//! This module provides:
//! - Database initialization and the embedded schema
//! - SQLite pragma configuration
//! - Repository layer for participants, staging and rankings

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::{staging_table_name, RecordStatus, Repository};
