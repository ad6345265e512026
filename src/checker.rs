//! Tag type checker.
//!
//! Turns a [`RawTag`] into a [`TypeCheckedTag`] against its tag class:
//! 1. Each provided attribute is looked up, converted and resolved
//! 2. Unset attributes get their defaults, or fail if mandatory
//! 3. The finished slots are frozen into the record
//!
//! Values are built in a scratch buffer local to one call. A suspension or
//! failure drops the buffer, so callers only ever see a complete record or
//! nothing. The first failure in attribute-name order is reported.

use std::sync::Arc;
use tracing::debug;

use crate::error::ResolutionError;
use crate::resolver::{Outcome, ResolutionEnv, TagSite, ValueResolver};
use crate::schema::AttributeSchema;
use crate::spelling::did_you_mean;
use crate::tag::{RawTag, TypeCheckedTag};
use crate::value::TypedValue;

pub struct TagTypeChecker;

impl TagTypeChecker {
    /// `Ok(None)` means a graph dependency is not ready yet; call again with
    /// the same inputs once it is.
    pub fn check(
        schema: &Arc<AttributeSchema>,
        raw: &RawTag,
        env: ResolutionEnv<'_>,
    ) -> Result<Option<TypeCheckedTag>, ResolutionError> {
        let site = TagSite {
            tag_kind: &raw.tag_kind_name,
            location: &raw.location,
        };
        let resolver = ValueResolver::new(env);
        let mut slots: Vec<Option<TypedValue>> = vec![None; schema.len()];

        debug!(
            tag = %raw.tag_kind_name,
            location = %raw.location,
            attributes = raw.attributes.len(),
            "type checking tag"
        );

        for (name, raw_value) in &raw.attributes {
            let Some(position) = schema.position_of(name) else {
                return Err(ResolutionError::UnknownAttribute {
                    tag_kind: raw.tag_kind_name.clone(),
                    location: raw.location.clone(),
                    attribute: name.clone(),
                    suggestion: did_you_mean(name, schema.names()),
                });
            };

            match resolver.resolve(raw_value, schema.descriptor(position), site) {
                Outcome::Ready(value) => slots[position] = Some(value),
                Outcome::Suspended => {
                    debug!(tag = %raw.tag_kind_name, attribute = %name, "tag not ready, restart required");
                    return Ok(None);
                }
                Outcome::Failed(e) => return Err(e),
            }
        }

        let mut values = Vec::with_capacity(slots.len());
        for (position, slot) in slots.into_iter().enumerate() {
            let descriptor = schema.descriptor(position);
            let value = match slot {
                Some(value) => value,
                None if descriptor.mandatory => {
                    return Err(ResolutionError::MissingMandatoryAttribute {
                        tag_kind: raw.tag_kind_name.clone(),
                        location: raw.location.clone(),
                        attribute: descriptor.name.clone(),
                    })
                }
                None => resolver.convert_default(descriptor, site)?,
            };
            values.push(value);
        }

        debug!(tag = %raw.tag_kind_name, "tag type checked");
        Ok(Some(TypeCheckedTag::new(
            Arc::clone(schema),
            values,
            raw.dev_dependency,
            raw.location.clone(),
            raw.tag_kind_name.clone(),
        )))
    }
}
