//! Orgtree - organizational hierarchy engine
//!
//! This crate keeps the department tree of the training management backend
//! consistent: no cycles, correct levels, unique names, codes and managers,
//! and safe reparenting when a department is removed.

pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod hierarchy;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use hierarchy::HierarchyEngine;
