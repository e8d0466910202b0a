//! Template engine: markers, schemas, field trees, value trees and output
//!
//! The pipeline for one form:
//! - [`schema::resolve_schemas`] merges the template's schema declarations
//! - [`field_tree::build`] turns the template into renderable fields
//! - [`field_tree::collect`] reads the edited fields back into a [`ValueTree`]
//! - [`output::generate`] substitutes the collected values into the template shape
//!
//! All of it is synchronous and free of I/O.

pub mod field_tree;
pub mod form;
pub mod marker;
pub mod output;
pub mod path;
pub mod schema;
pub mod trigger;
pub mod value_tree;

pub use field_tree::{ArrayGroup, ArrayItem, FieldNode, FieldTree, GroupNode, LeafField};
pub use form::{DeletePolicy, FormError, FormState};
pub use marker::Marker;
pub use output::{generate, OutputError, OutputFormat};
pub use path::{PathError, PathSegment, ValuePath};
pub use schema::{resolve_schemas, Schema, SchemaSet};
pub use trigger::{match_trigger, TriggerKey};
pub use value_tree::ValueTree;
