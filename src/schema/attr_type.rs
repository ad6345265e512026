//! Declared attribute types and their converters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::label::{LabelConverter, LabelSyntaxError};
use crate::value::{RawValue, TypedValue};

/// Failure converting a raw value to its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("expected value of type '{expected}' for attribute '{attribute}', but got {got} ({got_type})")]
    WrongType {
        attribute: String,
        expected: &'static str,
        got: String,
        got_type: &'static str,
    },

    #[error("invalid label '{value}' for attribute '{attribute}': {source}")]
    InvalidLabel {
        attribute: String,
        value: String,
        #[source]
        source: LabelSyntaxError,
    },
}

impl ConversionError {
    /// The label syntax error behind this failure, if any.
    pub fn label_error(&self) -> Option<&LabelSyntaxError> {
        match self {
            Self::InvalidLabel { source, .. } => Some(source),
            Self::WrongType { .. } => None,
        }
    }
}

/// The declared type of an attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrType {
    Bool,
    Int,
    String,
    Label,
    StringList,
    IntList,
    LabelList,
    StringDict,
    StringListDict,
}

impl AttrType {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::String => "string",
            Self::Label => "label",
            Self::StringList => "list(string)",
            Self::IntList => "list(int)",
            Self::LabelList => "list(label)",
            Self::StringDict => "dict(string, string)",
            Self::StringListDict => "dict(string, list(string))",
        }
    }

    /// Type of each element for list types; the type itself otherwise.
    pub fn element_type(&self) -> AttrType {
        match self {
            Self::StringList => Self::String,
            Self::IntList => Self::Int,
            Self::LabelList => Self::Label,
            other => *other,
        }
    }

    /// Whether a value of this type names a build target that is resolved
    /// through the graph. Label lists are converted but not resolved.
    pub fn is_label(&self) -> bool {
        matches!(self, Self::Label)
    }

    /// Value used for an optional attribute that declares no default.
    pub fn natural_default(&self) -> TypedValue {
        match self {
            Self::Bool => TypedValue::Bool(false),
            Self::Int => TypedValue::Int(0),
            Self::String => TypedValue::String(String::new()),
            Self::Label => TypedValue::None,
            Self::StringList | Self::IntList | Self::LabelList => TypedValue::List(Vec::new()),
            Self::StringDict | Self::StringListDict => TypedValue::Dict(BTreeMap::new()),
        }
    }

    /// Convert `raw` to this type. `attribute` is only used in errors.
    pub fn convert(
        &self,
        raw: &RawValue,
        attribute: &str,
        labels: &LabelConverter,
    ) -> Result<TypedValue, ConversionError> {
        let wrong_type = || ConversionError::WrongType {
            attribute: attribute.to_string(),
            expected: self.type_name(),
            got: short_repr(raw),
            got_type: raw.type_name(),
        };

        match (self, raw) {
            (Self::Bool, RawValue::Bool(b)) => Ok(TypedValue::Bool(*b)),
            (Self::Int, RawValue::Int(i)) => Ok(TypedValue::Int(*i)),
            (Self::String, RawValue::String(s)) => Ok(TypedValue::String(s.clone())),

            (Self::Label, RawValue::None) => Ok(TypedValue::None),
            (Self::Label, RawValue::String(s)) => convert_label(s, attribute, labels),

            (Self::StringList, RawValue::List(items)) => {
                convert_list(items, attribute, labels, Self::String)
            }
            (Self::IntList, RawValue::List(items)) => convert_list(items, attribute, labels, Self::Int),
            (Self::LabelList, RawValue::List(items)) => {
                convert_list(items, attribute, labels, Self::Label)
            }

            (Self::StringDict, RawValue::Dict(entries)) => {
                convert_dict(entries, attribute, labels, Self::String)
            }
            (Self::StringListDict, RawValue::Dict(entries)) => {
                convert_dict(entries, attribute, labels, Self::StringList)
            }

            _ => Err(wrong_type()),
        }
    }
}

fn convert_label(
    raw: &str,
    attribute: &str,
    labels: &LabelConverter,
) -> Result<TypedValue, ConversionError> {
    labels
        .convert(raw)
        .map(TypedValue::Label)
        .map_err(|source| ConversionError::InvalidLabel {
            attribute: attribute.to_string(),
            value: raw.to_string(),
            source,
        })
}

fn convert_list(
    items: &[RawValue],
    attribute: &str,
    labels: &LabelConverter,
    element: AttrType,
) -> Result<TypedValue, ConversionError> {
    // A `None` element is never valid, even in a label list
    if let Some(none) = items.iter().find(|i| matches!(i, RawValue::None)) {
        return Err(ConversionError::WrongType {
            attribute: attribute.to_string(),
            expected: element.type_name(),
            got: short_repr(none),
            got_type: none.type_name(),
        });
    }
    items
        .iter()
        .map(|item| element.convert(item, attribute, labels))
        .collect::<Result<Vec<_>, _>>()
        .map(TypedValue::List)
}

fn convert_dict(
    entries: &BTreeMap<String, RawValue>,
    attribute: &str,
    labels: &LabelConverter,
    value_type: AttrType,
) -> Result<TypedValue, ConversionError> {
    entries
        .iter()
        .map(|(k, v)| Ok((k.clone(), value_type.convert(v, attribute, labels)?)))
        .collect::<Result<BTreeMap<_, _>, ConversionError>>()
        .map(TypedValue::Dict)
}

fn short_repr(raw: &RawValue) -> String {
    let rendered = match raw {
        RawValue::None => "None".to_string(),
        RawValue::Bool(true) => "True".to_string(),
        RawValue::Bool(false) => "False".to_string(),
        RawValue::Int(i) => i.to_string(),
        RawValue::String(s) => format!("\"{}\"", s),
        RawValue::List(items) => format!("[... {} items]", items.len()),
        RawValue::Dict(entries) => format!("{{... {} entries}}", entries.len()),
    };
    if rendered.chars().count() > 64 {
        let truncated: String = rendered.chars().take(61).collect();
        format!("{}...", truncated)
    } else {
        rendered
    }
}
