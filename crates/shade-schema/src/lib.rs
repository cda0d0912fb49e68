//! Property schema for the ESP shade controller.
//!
//! The schema is a static, ordered tree of sections. Each entry is a
//! sub-heading, a button, or a field bound to a value in the device status,
//! configuration or client controls. Fields carry the value kind and device
//! command used to apply edits, and an optional `visible_if` dependency on
//! another property.
//!
//! [`Schema::new`] validates the tables once: keys and commands are unique,
//! `visible_if` references are acyclic, and configuration fields match the
//! device wire layout in kind, command and order.
//!
//! # Example
//!
//! ```rust,ignore
//! use shade_schema::{Schema, Snapshot};
//!
//! let schema = Schema::new()?;
//! let snapshot = Snapshot::default();
//!
//! assert!(!schema.is_visible("status.moving", &snapshot)?);
//! assert!(schema.is_visible("do_homing", &snapshot)?);
//! ```

mod definitions;
mod descriptor;
mod display;
mod error;
mod key;
mod schema;
mod visibility;

pub use definitions::{list, LISTS, SECTIONS};
pub use descriptor::*;
pub use error::*;
pub use key::*;
pub use schema::*;
pub use visibility::VisibilityGraph;
