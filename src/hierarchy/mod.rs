//! Organizational hierarchy engine
//!
//! Keeps the department tree acyclic, with correct levels and unique names,
//! codes and managers, across create, update and delete.

pub mod dto;
pub mod engine;
pub mod manager;
pub mod path;
pub mod snapshot;

pub use dto::{CreateDepartmentRequest, DepartmentView, UpdateDepartmentRequest};
pub use engine::HierarchyEngine;
pub use path::PathResolver;
pub use snapshot::{Snapshot, Violation};
