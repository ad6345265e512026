//! Build target labels and their resolution context.
//!
//! Canonical form is `@@repo//package:name`; the main repository is the
//! empty repository name (`@@//package:name`).
//!
//! Accepted input forms for user-supplied values:
//! - `@@repo//pkg:name` (canonical repository)
//! - `@apparent//pkg:name` (mapped through the converter's repository mapping)
//! - `@repo` (shorthand for `@repo//:repo`)
//! - `//pkg:name` and `//pkg` (name defaults to the last package segment)
//! - `:name` and `name` (relative to the converter's base package)

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Label syntax error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelSyntaxError {
    #[error("empty label")]
    Empty,

    #[error("invalid label '{label}': {reason}")]
    Invalid { label: String, reason: String },

    #[error("invalid label '{label}': no repository visible as '@{apparent}'")]
    UnknownRepository { label: String, apparent: String },
}

impl LabelSyntaxError {
    fn invalid(label: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            label: label.to_string(),
            reason: reason.into(),
        }
    }
}

/// A fully resolved build target label.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    repo: String,
    package: String,
    name: String,
}

impl Label {
    /// Parse a label that names its repository canonically (or the main
    /// repository through `//`). Relative and apparent-repository forms are
    /// rejected since there is no context to resolve them against.
    pub fn parse_canonical(raw: &str) -> Result<Self, LabelSyntaxError> {
        let parts = LabelParts::parse(raw)?;
        let repo = match parts.repo {
            RepoRef::Canonical(repo) => repo,
            RepoRef::Apparent(apparent) if apparent.is_empty() => String::new(),
            RepoRef::Apparent(_) => {
                return Err(LabelSyntaxError::invalid(
                    raw,
                    "canonical labels must use '@@' repository names",
                ))
            }
            RepoRef::Current => String::new(),
        };
        let Some(package) = parts.package else {
            return Err(LabelSyntaxError::invalid(
                raw,
                "canonical labels must be absolute",
            ));
        };
        Ok(Self {
            repo,
            package,
            name: parts.name,
        })
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_main_repo(&self) -> bool {
        self.repo.is_empty()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@@{}//{}:{}", self.repo, self.package, self.name)
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Label::parse_canonical(&raw).map_err(serde::de::Error::custom)
    }
}

/// Context for turning user-written label strings into [`Label`]s: the
/// repository and package the tag was written in, plus the repository
/// mapping visible from there.
#[derive(Clone, Debug, Default)]
pub struct LabelConverter {
    base_repo: String,
    base_package: String,
    repo_mapping: BTreeMap<String, String>,
}

impl LabelConverter {
    pub fn new(base_repo: impl Into<String>, base_package: impl Into<String>) -> Self {
        Self {
            base_repo: base_repo.into(),
            base_package: base_package.into(),
            repo_mapping: BTreeMap::new(),
        }
    }

    /// Converter rooted at the main repository's top-level package.
    pub fn main_repo() -> Self {
        Self::new("", "")
    }

    /// Make `@apparent` resolve to the canonical repository `canonical`.
    pub fn with_mapping(mut self, apparent: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.repo_mapping.insert(apparent.into(), canonical.into());
        self
    }

    pub fn base_repo(&self) -> &str {
        &self.base_repo
    }

    pub fn base_package(&self) -> &str {
        &self.base_package
    }

    pub fn convert(&self, raw: &str) -> Result<Label, LabelSyntaxError> {
        let parts = LabelParts::parse(raw)?;
        let repo = match parts.repo {
            RepoRef::Canonical(repo) => repo,
            // `@//` always names the main repository
            RepoRef::Apparent(apparent) if apparent.is_empty() => String::new(),
            RepoRef::Apparent(apparent) => match self.repo_mapping.get(&apparent) {
                Some(canonical) => canonical.clone(),
                None => {
                    return Err(LabelSyntaxError::UnknownRepository {
                        label: raw.to_string(),
                        apparent,
                    })
                }
            },
            RepoRef::Current => self.base_repo.clone(),
        };
        let package = parts
            .package
            .unwrap_or_else(|| self.base_package.clone());
        Ok(Label {
            repo,
            package,
            name: parts.name,
        })
    }
}

// =============================================================================
// PARSING
// =============================================================================

enum RepoRef {
    Current,
    Canonical(String),
    Apparent(String),
}

struct LabelParts {
    repo: RepoRef,
    /// `None` for relative labels
    package: Option<String>,
    name: String,
}

impl LabelParts {
    fn parse(raw: &str) -> Result<Self, LabelSyntaxError> {
        if raw.is_empty() {
            return Err(LabelSyntaxError::Empty);
        }

        let (repo, rest) = if let Some(stripped) = raw.strip_prefix("@@") {
            let (name, rest) = split_repo(raw, stripped)?;
            (RepoRef::Canonical(name), rest)
        } else if let Some(stripped) = raw.strip_prefix('@') {
            let (name, rest) = split_repo(raw, stripped)?;
            (RepoRef::Apparent(name), rest)
        } else {
            (RepoRef::Current, raw.to_string())
        };

        if let Some(absolute) = rest.strip_prefix("//") {
            let (package, name) = match absolute.split_once(':') {
                Some((package, name)) => (package.to_string(), name.to_string()),
                None => {
                    let last = absolute.rsplit('/').next().unwrap_or_default();
                    if last.is_empty() {
                        return Err(LabelSyntaxError::invalid(
                            raw,
                            "target name may not be empty",
                        ));
                    }
                    (absolute.to_string(), last.to_string())
                }
            };
            validate_package(raw, &package)?;
            validate_name(raw, &name)?;
            return Ok(Self {
                repo,
                package: Some(package),
                name,
            });
        }

        if !matches!(repo, RepoRef::Current) {
            return Err(LabelSyntaxError::invalid(
                raw,
                "expected '//' after repository name",
            ));
        }
        let name = rest.strip_prefix(':').unwrap_or(&rest).to_string();
        validate_name(raw, &name)?;
        Ok(Self {
            repo,
            package: None,
            name,
        })
    }
}

/// Split `repo//rest` (with the leading `@`s already removed). A bare `@repo`
/// expands to `@repo//:repo`.
fn split_repo(raw: &str, stripped: &str) -> Result<(String, String), LabelSyntaxError> {
    let (name, rest) = match stripped.find("//") {
        Some(idx) => (&stripped[..idx], stripped[idx..].to_string()),
        None if !stripped.contains(':') && !stripped.contains('/') && !stripped.is_empty() => {
            (stripped, format!("//:{}", stripped))
        }
        None => {
            return Err(LabelSyntaxError::invalid(
                raw,
                "expected '//' after repository name",
            ))
        }
    };
    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+' | '~'));
    if !valid {
        return Err(LabelSyntaxError::invalid(
            raw,
            format!("invalid repository name '{}'", name),
        ));
    }
    Ok((name.to_string(), rest))
}

fn validate_package(raw: &str, package: &str) -> Result<(), LabelSyntaxError> {
    if package.is_empty() {
        return Ok(());
    }
    if package.starts_with('/') || package.ends_with('/') {
        return Err(LabelSyntaxError::invalid(
            raw,
            "package names may not start or end with '/'",
        ));
    }
    for segment in package.split('/') {
        check_segment(raw, segment, "package")?;
    }
    Ok(())
}

fn validate_name(raw: &str, name: &str) -> Result<(), LabelSyntaxError> {
    if name.is_empty() {
        return Err(LabelSyntaxError::invalid(raw, "target name may not be empty"));
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err(LabelSyntaxError::invalid(
            raw,
            "target names may not start or end with '/'",
        ));
    }
    if name.contains(':') {
        return Err(LabelSyntaxError::invalid(
            raw,
            "target names may not contain ':'",
        ));
    }
    for segment in name.split('/') {
        check_segment(raw, segment, "target")?;
    }
    Ok(())
}

fn check_segment(raw: &str, segment: &str, what: &str) -> Result<(), LabelSyntaxError> {
    if segment.is_empty() {
        return Err(LabelSyntaxError::invalid(
            raw,
            format!("{} names may not contain '//'", what),
        ));
    }
    if segment == "." || segment == ".." {
        return Err(LabelSyntaxError::invalid(
            raw,
            format!("{} names may not contain '{}' segments", what, segment),
        ));
    }
    if let Some(c) = segment
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || *c == '\\')
    {
        return Err(LabelSyntaxError::invalid(
            raw,
            format!("{} names may not contain {:?}", what, c),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_canonical_forms() {
        let label = Label::parse_canonical("@@local_config_platform//:host").unwrap();
        assert_eq!(label.repo(), "local_config_platform");
        assert_eq!(label.package(), "");
        assert_eq!(label.name(), "host");
        assert_eq!(label.to_string(), "@@local_config_platform//:host");

        let main = Label::parse_canonical("//tools/gen").unwrap();
        assert!(main.is_main_repo());
        assert_eq!(main.name(), "gen");
        assert_eq!(main.to_string(), "@@//tools/gen:gen");
    }

    #[test]
    fn parse_canonical_rejects_relative_and_apparent() {
        assert!(Label::parse_canonical(":foo").is_err());
        assert!(Label::parse_canonical("@rules_cc//cc:defs").is_err());
    }

    #[test]
    fn converter_resolves_relative_labels() {
        let conv = LabelConverter::new("my_ext", "pkg/sub");
        let label = conv.convert(":gen").unwrap();
        assert_eq!(label.to_string(), "@@my_ext//pkg/sub:gen");

        let bare = conv.convert("data/file.txt").unwrap();
        assert_eq!(bare.package(), "pkg/sub");
        assert_eq!(bare.name(), "data/file.txt");
    }

    #[test]
    fn converter_maps_apparent_repos() {
        let conv = LabelConverter::main_repo().with_mapping("rules_cc", "rules_cc+");
        let label = conv.convert("@rules_cc//cc:toolchain").unwrap();
        assert_eq!(label.to_string(), "@@rules_cc+//cc:toolchain");

        let shorthand = conv.convert("@rules_cc").unwrap();
        assert_eq!(shorthand.to_string(), "@@rules_cc+//:rules_cc");

        let err = conv.convert("@unknown//:x").unwrap_err();
        assert!(matches!(err, LabelSyntaxError::UnknownRepository { .. }));
    }

    #[test]
    fn at_slash_slash_is_main_repo() {
        let conv = LabelConverter::new("other", "x").with_mapping("", "ignored");
        assert!(conv.convert("@//foo:bar").unwrap().is_main_repo());
    }

    #[test]
    fn malformed_labels() {
        let conv = LabelConverter::main_repo();
        assert_eq!(conv.convert(""), Err(LabelSyntaxError::Empty));
        assert!(conv.convert("//foo:").is_err());
        assert!(conv.convert("//foo/../bar:x").is_err());
        assert!(conv.convert("//foo:a b").is_err());
        assert!(conv.convert("@@repo:foo").is_err());
        assert!(conv.convert("@@bad repo//:x").is_err());
        assert!(conv.convert("//foo//bar:x").is_err());
    }

    #[test]
    fn serde_uses_canonical_string() {
        let label = Label::parse_canonical("@@r//p:n").unwrap();
        let json = serde_json::to_string(&label).unwrap();
        assert_eq!(json, "\"@@r//p:n\"");
        let back: Label = serde_json::from_str(&json).unwrap();
        assert_eq!(back, label);
    }
}
