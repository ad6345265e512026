//! Attribute schemas (tag classes).
//!
//! A schema is an ordered list of attribute descriptors. Each attribute gets a
//! stable position at construction time; positions are what type-checked
//! records are indexed by, and names are only looked up at the boundary.

mod allowed;
mod attr_type;

pub use allowed::{AllowedValuePredicate, AllowedValues};
pub use attr_type::{AttrType, ConversionError};

use std::collections::HashMap;
use thiserror::Error;

use crate::value::RawValue;

/// Invalid schema definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("tag class '{tag_class}' declares attribute '{attribute}' more than once")]
    DuplicateAttribute { tag_class: String, attribute: String },

    #[error("tag class '{tag_class}': mandatory attribute '{attribute}' may not have a default value")]
    MandatoryWithDefault { tag_class: String, attribute: String },

    #[error("tag class '{tag_class}': attribute name '{attribute}' is not a valid identifier")]
    InvalidName { tag_class: String, attribute: String },

    #[error("tag class '{tag_class}': invalid allowed value for attribute '{attribute}': {source}")]
    InvalidAllowedValue {
        tag_class: String,
        attribute: String,
        #[source]
        source: ConversionError,
    },
}

/// Declaration of a single attribute.
#[derive(Clone, Debug)]
pub struct AttributeDescriptor {
    pub name: String,
    pub attr_type: AttrType,
    pub mandatory: bool,
    /// Raw default; `None` means the type's natural default.
    pub default: Option<RawValue>,
    pub allowed_values: Option<AllowedValues>,
    pub doc: Option<String>,
}

impl AttributeDescriptor {
    pub fn new(name: impl Into<String>, attr_type: AttrType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            mandatory: false,
            default: None,
            allowed_values: None,
            doc: None,
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<RawValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_allowed_values(mut self, allowed: AllowedValues) -> Self {
        self.allowed_values = Some(allowed);
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

/// Ordered, immutable attribute schema of one tag class.
#[derive(Debug)]
pub struct AttributeSchema {
    name: String,
    attributes: Vec<AttributeDescriptor>,
    indices: HashMap<String, usize>,
}

impl AttributeSchema {
    pub fn new(
        name: impl Into<String>,
        attributes: Vec<AttributeDescriptor>,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        let mut indices = HashMap::with_capacity(attributes.len());

        for (position, attr) in attributes.iter().enumerate() {
            if !is_identifier(&attr.name) {
                return Err(SchemaError::InvalidName {
                    tag_class: name,
                    attribute: attr.name.clone(),
                });
            }
            if attr.mandatory && attr.default.is_some() {
                return Err(SchemaError::MandatoryWithDefault {
                    tag_class: name,
                    attribute: attr.name.clone(),
                });
            }
            if indices.insert(attr.name.clone(), position).is_some() {
                return Err(SchemaError::DuplicateAttribute {
                    tag_class: name,
                    attribute: attr.name.clone(),
                });
            }
        }

        Ok(Self {
            name,
            attributes,
            indices,
        })
    }

    /// Name of the tag class this schema describes.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    /// Panics if `position` is out of range; positions come from
    /// [`position_of`](Self::position_of) or `0..len()`.
    pub fn descriptor(&self, position: usize) -> &AttributeDescriptor {
        &self.attributes[position]
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Attribute names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }
}

/// Equal when both declare the same attributes in the same order. Allowed
/// values and docs are not compared.
impl PartialEq for AttributeSchema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.attributes.len() == other.attributes.len()
            && self
                .attributes
                .iter()
                .zip(&other.attributes)
                .all(|(a, b)| {
                    a.name == b.name
                        && a.attr_type == b.attr_type
                        && a.mandatory == b.mandatory
                        && a.default == b.default
                })
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
