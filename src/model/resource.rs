//! Shared resource definitions (styles, numbering) referenced by content.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A named definition that document content refers to by identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Identifier (`w:styleId`, `w:abstractNumId`, `w:numId`)
    pub id: String,

    /// Resource type
    pub kind: ResourceKind,

    /// The complete definition element
    #[serde(skip_serializing)]
    pub xml: String,
}

impl Resource {
    /// Create a new resource.
    pub fn new(kind: ResourceKind, id: impl Into<String>, xml: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            xml: xml.into(),
        }
    }

    /// Create a style resource.
    pub fn style(id: impl Into<String>, xml: impl Into<String>) -> Self {
        Self::new(ResourceKind::Style, id, xml)
    }

    /// Check if this is a style.
    pub fn is_style(&self) -> bool {
        matches!(self.kind, ResourceKind::Style)
    }

    /// Check if this belongs to the numbering part.
    pub fn is_numbering(&self) -> bool {
        matches!(
            self.kind,
            ResourceKind::AbstractNumbering | ResourceKind::Numbering
        )
    }
}

/// Type of shared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Paragraph, character, table or numbering style
    Style,
    /// Abstract numbering definition
    AbstractNumbering,
    /// Numbering instance pointing at an abstract definition
    Numbering,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceKind::Style => "style",
            ResourceKind::AbstractNumbering => "abstract numbering",
            ResourceKind::Numbering => "numbering",
        };
        f.write_str(name)
    }
}

/// Ordered table of resources, unique by (kind, id).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTable {
    resources: Vec<Resource>,
}

impl ResourceTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a resource.
    pub fn get(&self, kind: ResourceKind, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.kind == kind && r.id == id)
    }

    /// Check whether an identifier resolves.
    pub fn contains(&self, kind: ResourceKind, id: &str) -> bool {
        self.get(kind, id).is_some()
    }

    /// Insert a resource, replacing any existing definition with the same identifier.
    pub fn insert(&mut self, resource: Resource) {
        match self
            .resources
            .iter_mut()
            .find(|r| r.kind == resource.kind && r.id == resource.id)
        {
            Some(existing) => *existing = resource,
            None => self.resources.push(resource),
        }
    }

    /// Add the definitions from `other` that are not present yet.
    ///
    /// Returns how many were added. An identifier that is already present
    /// with different content is a conflict.
    pub fn merge_from(&mut self, other: &ResourceTable) -> Result<usize> {
        let mut added = 0;
        for resource in &other.resources {
            match self.get(resource.kind, &resource.id) {
                Some(existing) if existing.xml == resource.xml => {}
                Some(_) => {
                    return Err(Error::Compose(format!(
                        "conflicting {} definitions for identifier '{}'",
                        resource.kind, resource.id
                    )))
                }
                None => {
                    self.resources.push(resource.clone());
                    added += 1;
                }
            }
        }
        Ok(added)
    }

    /// Iterate over resources in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    /// Iterate over resources of one kind.
    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(move |r| r.kind == kind)
    }

    /// Identifiers of one kind.
    pub fn ids(&self, kind: ResourceKind) -> BTreeSet<&str> {
        self.of_kind(kind).map(|r| r.id.as_str()).collect()
    }

    /// Number of resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl FromIterator<Resource> for ResourceTable {
    fn from_iter<I: IntoIterator<Item = Resource>>(iter: I) -> Self {
        let mut table = ResourceTable::new();
        for resource in iter {
            table.insert(resource);
        }
        table
    }
}
