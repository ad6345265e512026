//! Raw and type-checked attribute values.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::label::Label;

/// Untyped value as written by the user in a tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    None,
    Bool(bool),
    Int(i64),
    String(String),
    List(Vec<RawValue>),
    Dict(BTreeMap<String, RawValue>),
}

impl RawValue {
    /// Type name used in conversion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<RawValue>> From<Vec<T>> for RawValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// A value converted to its attribute's declared type.
///
/// A resolved label attribute whose target is a rule carries the target's
/// exported providers instead of the label.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    None,
    Bool(bool),
    Int(i64),
    String(String),
    Label(Label),
    List(Vec<TypedValue>),
    Dict(BTreeMap<String, TypedValue>),
    Providers(ProviderView),
}

impl TypedValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&Label> {
        match self {
            Self::Label(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_providers(&self) -> Option<&ProviderView> {
        match self {
            Self::Providers(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Render the way a user would have written it, for diagnostics.
    pub fn repr(&self) -> String {
        match self {
            Self::None => "None".to_string(),
            Self::Bool(true) => "True".to_string(),
            Self::Bool(false) => "False".to_string(),
            Self::Int(i) => i.to_string(),
            Self::String(s) => format!("'{}'", s),
            Self::Label(l) => format!("Label(\"{}\")", l),
            Self::List(items) => {
                let inner: Vec<_> = items.iter().map(TypedValue::repr).collect();
                format!("[{}]", inner.join(", "))
            }
            Self::Dict(entries) => {
                let inner: Vec<_> = entries
                    .iter()
                    .map(|(k, v)| format!("'{}': {}", k, v.repr()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            Self::Providers(p) => format!("<providers {}>", p.names().collect::<Vec<_>>().join(", ")),
        }
    }
}

// =============================================================================
// PROVIDERS
// =============================================================================

/// Error reading a provider out of a [`ProviderView`].
#[derive(Debug, Error)]
pub enum ProviderAccessError {
    #[error("target does not export provider '{0}'")]
    Missing(String),

    #[error("provider '{name}' has unexpected shape: {source}")]
    Shape {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The providers exported by a configured rule target, keyed by provider
/// name. Payloads are opaque JSON; callers pick them apart with
/// [`ProviderView::get_as`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderView {
    providers: BTreeMap<String, serde_json::Value>,
}

impl ProviderView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, payload: serde_json::Value) -> Self {
        self.providers.insert(name.into(), payload);
        self
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.providers.get(name)
    }

    /// Deserialize the payload of provider `name` into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, ProviderAccessError> {
        let payload = self
            .providers
            .get(name)
            .ok_or_else(|| ProviderAccessError::Missing(name.to_string()))?;
        T::deserialize(payload).map_err(|source| ProviderAccessError::Shape {
            name: name.to_string(),
            source,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl FromIterator<(String, serde_json::Value)> for ProviderView {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Self {
            providers: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_value_from_yaml() {
        let raw: RawValue = serde_yaml::from_str("[1, \"two\", true, null]").unwrap();
        assert_eq!(
            raw,
            RawValue::List(vec![
                RawValue::Int(1),
                RawValue::String("two".into()),
                RawValue::Bool(true),
                RawValue::None,
            ])
        );
    }

    #[test]
    fn provider_typed_access() {
        #[derive(Deserialize)]
        struct DefaultInfo {
            files: Vec<String>,
        }

        let view = ProviderView::new().with("DefaultInfo", json!({ "files": ["out/gen.txt"] }));
        let info: DefaultInfo = view.get_as("DefaultInfo").unwrap();
        assert_eq!(info.files, vec!["out/gen.txt"]);

        assert!(matches!(
            view.get_as::<DefaultInfo>("OutputGroupInfo"),
            Err(ProviderAccessError::Missing(_))
        ));
        assert!(matches!(
            view.get_as::<Vec<u8>>("DefaultInfo"),
            Err(ProviderAccessError::Shape { .. })
        ));
    }

    #[test]
    fn repr_matches_user_syntax() {
        let value = TypedValue::List(vec![
            TypedValue::String("a".into()),
            TypedValue::Bool(true),
            TypedValue::None,
        ]);
        assert_eq!(value.repr(), "['a', True, None]");
    }
}
