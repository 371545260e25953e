//! Typed hierarchy snapshots and their XML form.

mod types;
mod xml;

pub use types::{HierarchyScope, Node, NodeKind, ObjectKind, Tree};
pub use xml::{parse_hierarchy, render_hierarchy};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HierarchyError {
    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Invalid attribute: {0}")]
    AttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("Element '{element}' is missing attribute '{attribute}'")]
    MissingAttribute { element: String, attribute: String },

    #[error("Expected namespace {expected}, found {found:?}")]
    NamespaceMismatch {
        expected: String,
        found: Option<String>,
    },

    #[error("Malformed hierarchy: {0}")]
    Malformed(String),

    #[error("Failed to write hierarchy: {0}")]
    Write(String),
}
