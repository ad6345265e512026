//! Allowed-value predicates for attributes.

use regex::Regex;
use std::fmt;
use std::sync::Arc;

use crate::value::TypedValue;

/// A predicate restricting which converted values an attribute accepts.
pub trait AllowedValuePredicate: fmt::Debug + Send + Sync {
    fn apply(&self, value: &TypedValue) -> bool;

    /// Completes the sentence "the value for attribute X ...".
    fn rejection_reason(&self, value: &TypedValue) -> String;
}

/// Built-in allowed-value rules. Lists are checked element by element.
#[derive(Clone, Debug)]
pub enum AllowedValues {
    /// Value must equal one of these
    OneOf(Vec<TypedValue>),
    /// String value must match
    Pattern { regex: Regex, description: String },
    /// Integer value must lie in the inclusive range
    Range { min: Option<i64>, max: Option<i64> },
    Custom(Arc<dyn AllowedValuePredicate>),
}

impl AllowedValues {
    pub fn pattern(regex: &str, description: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self::Pattern {
            regex: Regex::new(regex)?,
            description: description.into(),
        })
    }

    fn accepts_scalar(&self, value: &TypedValue) -> bool {
        match self {
            Self::OneOf(allowed) => allowed.contains(value),
            Self::Pattern { regex, .. } => match value {
                TypedValue::String(s) => regex.is_match(s),
                _ => true,
            },
            Self::Range { min, max } => match value {
                TypedValue::Int(i) => {
                    min.map_or(true, |min| *i >= min) && max.map_or(true, |max| *i <= max)
                }
                _ => true,
            },
            Self::Custom(predicate) => predicate.apply(value),
        }
    }

    fn scalar_reason(&self, value: &TypedValue) -> String {
        match self {
            Self::OneOf(allowed) => {
                let options: Vec<_> = allowed.iter().map(TypedValue::repr).collect();
                format!(
                    "must be one of [{}] instead of {}",
                    options.join(", "),
                    value.repr()
                )
            }
            Self::Pattern { description, .. } => {
                format!("must match {} but was {}", description, value.repr())
            }
            Self::Range { min, max } => match (min, max) {
                (Some(min), Some(max)) => {
                    format!("must be between {} and {} but was {}", min, max, value.repr())
                }
                (Some(min), None) => format!("must be >= {} but was {}", min, value.repr()),
                (None, Some(max)) => format!("must be <= {} but was {}", max, value.repr()),
                (None, None) => format!("was rejected: {}", value.repr()),
            },
            Self::Custom(predicate) => predicate.rejection_reason(value),
        }
    }
}

impl AllowedValuePredicate for AllowedValues {
    fn apply(&self, value: &TypedValue) -> bool {
        match value {
            TypedValue::List(items) => items.iter().all(|item| self.accepts_scalar(item)),
            _ => self.accepts_scalar(value),
        }
    }

    fn rejection_reason(&self, value: &TypedValue) -> String {
        match value {
            TypedValue::List(items) => items
                .iter()
                .find(|item| !self.accepts_scalar(item))
                .map(|item| self.scalar_reason(item))
                .unwrap_or_else(|| self.scalar_reason(value)),
            _ => self.scalar_reason(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> TypedValue {
        TypedValue::String(v.to_string())
    }

    #[test]
    fn one_of() {
        let allowed = AllowedValues::OneOf(vec![s("debug"), s("release")]);
        assert!(allowed.apply(&s("debug")));
        assert!(!allowed.apply(&s("fast")));
        assert_eq!(
            allowed.rejection_reason(&s("fast")),
            "must be one of ['debug', 'release'] instead of 'fast'"
        );
    }

    #[test]
    fn lists_are_checked_per_element() {
        let allowed = AllowedValues::OneOf(vec![s("a"), s("b")]);
        let ok = TypedValue::List(vec![s("a"), s("b"), s("a")]);
        let bad = TypedValue::List(vec![s("a"), s("z")]);
        assert!(allowed.apply(&ok));
        assert!(!allowed.apply(&bad));
        assert!(allowed.rejection_reason(&bad).ends_with("instead of 'z'"));
    }

    #[test]
    fn pattern() {
        let allowed = AllowedValues::pattern(r"^\d+\.\d+\.\d+$", "a semantic version").unwrap();
        assert!(allowed.apply(&s("1.2.3")));
        assert!(!allowed.apply(&s("latest")));
        assert_eq!(
            allowed.rejection_reason(&s("latest")),
            "must match a semantic version but was 'latest'"
        );
    }

    #[test]
    fn range() {
        let allowed = AllowedValues::Range {
            min: Some(1),
            max: Some(8),
        };
        assert!(allowed.apply(&TypedValue::Int(4)));
        assert!(!allowed.apply(&TypedValue::Int(9)));
        assert_eq!(
            allowed.rejection_reason(&TypedValue::Int(0)),
            "must be between 1 and 8 but was 0"
        );
    }

    #[derive(Debug)]
    struct NonEmpty;

    impl AllowedValuePredicate for NonEmpty {
        fn apply(&self, value: &TypedValue) -> bool {
            value.as_str().map_or(true, |s| !s.is_empty())
        }

        fn rejection_reason(&self, _value: &TypedValue) -> String {
            "may not be empty".to_string()
        }
    }

    #[test]
    fn custom_predicate() {
        let allowed = AllowedValues::Custom(Arc::new(NonEmpty));
        assert!(allowed.apply(&s("x")));
        assert!(!allowed.apply(&s("")));
        assert_eq!(allowed.rejection_reason(&s("")), "may not be empty");
    }
}
