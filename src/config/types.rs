//! Configuration types (deserialized from YAML).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::label::LabelConverter;
use crate::schema::{AllowedValues, AttrType, AttributeDescriptor, AttributeSchema, SchemaError};
use crate::value::RawValue;

pub const DEFAULT_HOST_PLATFORM: &str = "@@local_config_platform//:host";

/// Resolver settings (`resolver.yaml`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Platform label used to obtain the baseline exec configuration for
    /// label-typed attributes.
    pub host_platform: String,
    pub after_exec_transition: bool,
    /// Build every output of a resolved rule target before the tag is ready.
    pub materialize_outputs: bool,
    /// Upper bound on restarts for [`crate::restart::run_with_restarts`].
    pub max_restarts: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            host_platform: DEFAULT_HOST_PLATFORM.to_string(),
            after_exec_transition: true,
            materialize_outputs: true,
            max_restarts: 32,
        }
    }
}

/// Tag class definitions (`tag_classes.yaml` or `tag_classes/*.yaml`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TagClassesConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub tag_classes: BTreeMap<String, TagClassConfig>,
}

fn default_version() -> String {
    "1.0".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TagClassConfig {
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub attrs: Vec<AttrConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttrConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: AttrType,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub default: Option<RawValue>,
    /// Allowed values, written in the element type for list attributes.
    #[serde(default)]
    pub values: Option<Vec<RawValue>>,
    #[serde(default)]
    pub doc: Option<String>,
}

impl TagClassConfig {
    /// Build the schema of tag class `name`. Allowed values are converted to
    /// the attribute's (element) type, resolving labels with `labels`.
    pub fn into_schema(
        self,
        name: &str,
        labels: &LabelConverter,
    ) -> Result<AttributeSchema, SchemaError> {
        let attrs = self
            .attrs
            .into_iter()
            .map(|attr| attr.into_descriptor(name, labels))
            .collect::<Result<Vec<_>, _>>()?;
        AttributeSchema::new(name, attrs)
    }
}

impl AttrConfig {
    fn into_descriptor(
        self,
        tag_class: &str,
        labels: &LabelConverter,
    ) -> Result<AttributeDescriptor, SchemaError> {
        let mut descriptor = AttributeDescriptor::new(self.name, self.attr_type);
        descriptor.mandatory = self.mandatory;
        descriptor.default = self.default;

        if let Some(values) = self.values {
            let element = self.attr_type.element_type();
            let allowed = values
                .iter()
                .map(|raw| element.convert(raw, &descriptor.name, labels))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|source| SchemaError::InvalidAllowedValue {
                    tag_class: tag_class.to_string(),
                    attribute: descriptor.name.clone(),
                    source,
                })?;
            descriptor = descriptor.with_allowed_values(AllowedValues::OneOf(allowed));
        }
        if let Some(doc) = self.doc {
            descriptor = descriptor.with_doc(doc);
        }
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Label;
    use crate::schema::AllowedValuePredicate;
    use crate::value::TypedValue;

    #[test]
    fn resolver_config_defaults_fill_missing_fields() {
        let config: ResolverConfig = serde_yaml::from_str("materialize_outputs: false").unwrap();
        assert!(!config.materialize_outputs);
        assert!(config.after_exec_transition);
        assert_eq!(config.host_platform, DEFAULT_HOST_PLATFORM);
    }

    #[test]
    fn tag_class_into_schema() {
        let yaml = r#"
attrs:
  - name: name
    type: string
    mandatory: true
  - name: mode
    type: string
    default: opt
    values: [opt, dbg]
  - name: tool
    type: label
"#;
        let config: TagClassConfig = serde_yaml::from_str(yaml).unwrap();
        let schema = config.into_schema("toolchain", &LabelConverter::main_repo()).unwrap();
        assert_eq!(schema.name(), "toolchain");
        assert_eq!(schema.len(), 3);
        assert!(schema.descriptor(0).mandatory);
        assert_eq!(schema.descriptor(1).default, Some(RawValue::String("opt".into())));
        assert!(schema.descriptor(1).allowed_values.is_some());
        assert_eq!(schema.descriptor(2).attr_type, AttrType::Label);
    }

    #[test]
    fn allowed_values_take_the_attribute_type() {
        let yaml = r#"
attrs:
  - name: tool
    type: label
    values: ["//gen:tool", "@rules_cc//cc:cc"]
  - name: srcs
    type: label_list
    values: [":a"]
  - name: jobs
    type: int_list
    values: [1, 2]
"#;
        let config: TagClassConfig = serde_yaml::from_str(yaml).unwrap();
        let labels = LabelConverter::new("my_ext", "pkg").with_mapping("rules_cc", "rules_cc+");
        let schema = config.into_schema("t", &labels).unwrap();

        let tool = schema.descriptor(0).allowed_values.as_ref().unwrap();
        let gen = Label::parse_canonical("@@my_ext//gen:tool").unwrap();
        assert!(tool.apply(&TypedValue::Label(gen)));
        let cc = Label::parse_canonical("@@rules_cc+//cc:cc").unwrap();
        assert!(tool.apply(&TypedValue::Label(cc)));
        assert!(!tool.apply(&TypedValue::String("//gen:tool".into())));

        let srcs = schema.descriptor(1).allowed_values.as_ref().unwrap();
        let a = Label::parse_canonical("@@my_ext//pkg:a").unwrap();
        assert!(srcs.apply(&TypedValue::List(vec![TypedValue::Label(a)])));

        let jobs = schema.descriptor(2).allowed_values.as_ref().unwrap();
        assert!(jobs.apply(&TypedValue::List(vec![TypedValue::Int(2)])));
        assert!(!jobs.apply(&TypedValue::List(vec![TypedValue::Int(3)])));
    }

    #[test]
    fn unconvertible_allowed_value_is_a_schema_error() {
        let yaml = r#"
attrs:
  - name: tool
    type: label
    values: ["//bad:"]
  - name: n
    type: int
    values: ["seven"]
"#;
        let config: TagClassConfig = serde_yaml::from_str(yaml).unwrap();
        let err = config.into_schema("t", &LabelConverter::main_repo()).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::InvalidAllowedValue { ref attribute, .. } if attribute == "tool"
        ));
    }
}
