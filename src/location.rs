//! Source positions of tags in module files.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a tag was declared in user source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Placeholder for tags synthesized outside any file.
    pub fn builtin() -> Self {
        Self::new("<builtin>", 0, 0)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            return write!(f, "{}", self.file);
        }
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_position() {
        let loc = Location::new("/ws/MODULE.bazel", 12, 5);
        assert_eq!(loc.to_string(), "/ws/MODULE.bazel:12:5");
    }

    #[test]
    fn display_builtin() {
        assert_eq!(Location::builtin().to_string(), "<builtin>");
    }
}
