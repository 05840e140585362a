//! Core types and traits for relmodel.
//!
//! This crate provides the foundations shared by the query compiler and the
//! CRUD surface:
//!
//! - `Value` for bound parameters and `Record` for fetched rows
//! - `ColumnCatalog` describing a model's columns
//! - `Driver`, the single-operation database contract
//! - `DataMapper` for schema-driven payload mapping
//! - `Outcome` re-export from asupersync for cancel-correct operations
//! - `Cx` context for structured concurrency

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod catalog;
pub mod coerce;
pub mod connection;
pub mod error;
pub mod identifiers;
pub mod mapper;
pub mod pattern;
pub mod value;

pub use catalog::{ColumnCatalog, ColumnDefinition, TypeTag};
pub use connection::{Driver, DriverResponse, Record};
pub use error::{DriverError, Error, ModelError, ModelErrorKind, Result};
pub use identifiers::{inject_identifier, sanitize_identifier};
pub use mapper::{DataMapper, NamingConvention};
pub use value::Value;
