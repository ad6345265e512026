//! Raw tags and type-checked tags.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::location::Location;
use crate::schema::AttributeSchema;
use crate::value::{RawValue, TypedValue};

/// A tag as written by the user, before any validation.
#[derive(Clone, Debug, PartialEq)]
pub struct RawTag {
    pub attributes: BTreeMap<String, RawValue>,
    pub location: Location,
    /// Whether the tag came from an extension proxy with `dev_dependency = True`
    pub dev_dependency: bool,
    pub tag_kind_name: String,
}

impl RawTag {
    pub fn new(tag_kind_name: impl Into<String>, location: Location) -> Self {
        Self {
            attributes: BTreeMap::new(),
            location,
            dev_dependency: false,
            tag_kind_name: tag_kind_name.into(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn dev_dependency(mut self, dev: bool) -> Self {
        self.dev_dependency = dev;
        self
    }
}

/// A tag whose attribute values have been type-checked against its tag
/// class. Values are indexed by schema position; every slot is filled.
#[derive(Clone, Debug)]
pub struct TypeCheckedTag {
    schema: Arc<AttributeSchema>,
    values: Box<[TypedValue]>,
    dev_dependency: bool,
    // only used for error reporting
    location: Location,
    tag_kind_name: String,
}

impl TypeCheckedTag {
    /// `values` must be index-aligned with `schema`.
    pub(crate) fn new(
        schema: Arc<AttributeSchema>,
        values: Vec<TypedValue>,
        dev_dependency: bool,
        location: Location,
        tag_kind_name: String,
    ) -> Self {
        debug_assert_eq!(values.len(), schema.len());
        Self {
            schema,
            values: values.into_boxed_slice(),
            dev_dependency,
            location,
            tag_kind_name,
        }
    }

    /// Value of attribute `name`; `None` if the tag class has no such
    /// attribute.
    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.schema.position_of(name).map(|i| &self.values[i])
    }

    pub fn get_at(&self, position: usize) -> Option<&TypedValue> {
        self.values.get(position)
    }

    /// All declared attribute names, whether or not the user set them.
    pub fn field_names(&self) -> BTreeSet<&str> {
        self.schema.names().collect()
    }

    pub fn values(&self) -> &[TypedValue] {
        &self.values
    }

    pub fn is_dev_dependency(&self) -> bool {
        self.dev_dependency
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn tag_kind_name(&self) -> &str {
        &self.tag_kind_name
    }

    pub fn schema(&self) -> &Arc<AttributeSchema> {
        &self.schema
    }

    pub fn error_message_for_unknown_field(&self, field: &str) -> String {
        format!("unknown attribute {}", field)
    }
}

impl PartialEq for TypeCheckedTag {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.schema, &other.schema) || *self.schema == *other.schema)
            && self.values == other.values
            && self.dev_dependency == other.dev_dependency
            && self.location == other.location
            && self.tag_kind_name == other.tag_kind_name
    }
}

impl fmt::Display for TypeCheckedTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' tag at {}", self.tag_kind_name, self.location)
    }
}

/// Serializes as an attribute name → value map in declaration order.
impl Serialize for TypeCheckedTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.schema.names().zip(self.values.iter()) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
