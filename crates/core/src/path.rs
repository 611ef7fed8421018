//! Hierarchical addressing
//!
//! A [`DataPath`] is the ordered list of names from a root object down to a
//! target object. Paths are plain data: they carry no identity and stay
//! valid as long as no ancestor is renamed, moved or removed.

use crate::error::{StructuraError, StructuraResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator used by the textual form of a path
pub const PATH_SEPARATOR: char = '/';

/// Ordered sequence of object names from a root to a target
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataPath {
    segments: Vec<String>,
}

/// Check that `name` can be used as a single path segment
pub fn validate_name(name: &str) -> StructuraResult<()> {
    if name.is_empty() {
        return Err(StructuraError::InvalidName {
            name: name.to_string(),
            reason: "name is empty".to_string(),
        });
    }
    if name.contains(PATH_SEPARATOR) {
        return Err(StructuraError::InvalidName {
            name: name.to_string(),
            reason: format!("name contains '{}'", PATH_SEPARATOR),
        });
    }
    Ok(())
}

impl DataPath {
    /// The empty path, addressing the (virtual) top level of the graph
    pub fn empty() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Single-segment path naming a root object
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// Build a path from already-validated segments
    pub fn from_segments<I, S>(segments: I) -> StructuraResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        for segment in &segments {
            validate_name(segment)?;
        }
        Ok(Self { segments })
    }

    /// Parse the `/`-separated form. Leading and trailing separators are ignored.
    pub fn parse(text: &str) -> StructuraResult<Self> {
        let trimmed = text.trim_matches(PATH_SEPARATOR);
        if trimmed.is_empty() {
            return Ok(Self::empty());
        }
        Self::from_segments(trimmed.split(PATH_SEPARATOR))
    }

    /// Names from root to target
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True for the empty path
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Target name (last segment)
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Path of the parent, `None` for the empty path
    pub fn parent(&self) -> Option<DataPath> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Path of the child `name` under this path
    pub fn join(&self, name: &str) -> StructuraResult<DataPath> {
        validate_name(name)?;
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Ok(Self { segments })
    }

    /// Same parent, different final name
    pub fn with_name(&self, name: &str) -> StructuraResult<DataPath> {
        match self.parent() {
            Some(parent) => parent.join(name),
            None => Err(StructuraError::invalid_operation(
                "the empty path has no name to replace",
            )),
        }
    }

    /// True if `self` equals `ancestor` or lies below it
    pub fn starts_with(&self, ancestor: &DataPath) -> bool {
        self.segments.len() >= ancestor.segments.len()
            && self.segments[..ancestor.segments.len()] == ancestor.segments[..]
    }

    /// True if `self` lies strictly below `ancestor`
    pub fn is_descendant_of(&self, ancestor: &DataPath) -> bool {
        self.segments.len() > ancestor.segments.len() && self.starts_with(ancestor)
    }

    /// Rewrite a leading `old` prefix into `new`, `None` if the prefix doesn't match
    pub fn replace_prefix(&self, old: &DataPath, new: &DataPath) -> Option<DataPath> {
        if !self.starts_with(old) {
            return None;
        }
        let mut segments = new.segments.clone();
        segments.extend_from_slice(&self.segments[old.segments.len()..]);
        Some(Self { segments })
    }
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "{}", PATH_SEPARATOR);
        }
        write!(f, "{}", self.segments.join("/"))
    }
}

impl FromStr for DataPath {
    type Err = StructuraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataPath::parse(s)
    }
}

impl TryFrom<String> for DataPath {
    type Error = StructuraError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DataPath::parse(&value)
    }
}

impl From<DataPath> for String {
    fn from(path: DataPath) -> Self {
        if path.is_empty() {
            String::new()
        } else {
            path.segments.join("/")
        }
    }
}

impl From<&DataPath> for DataPath {
    fn from(path: &DataPath) -> Self {
        path.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let path = DataPath::parse("G/AM/X").unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.name(), Some("X"));
        assert_eq!(path.to_string(), "G/AM/X");
        assert_eq!(DataPath::parse("/G/AM/").unwrap().to_string(), "G/AM");
    }

    #[test]
    fn parse_empty_is_top_level() {
        let path = DataPath::parse("").unwrap();
        assert!(path.is_empty());
        assert_eq!(path.parent(), None);
        assert_eq!(path.to_string(), "/");
    }

    #[test]
    fn empty_segment_is_rejected() {
        assert!(matches!(
            DataPath::parse("G//X"),
            Err(StructuraError::InvalidName { .. })
        ));
    }

    #[test]
    fn parent_and_join() {
        let path = DataPath::parse("G/AM").unwrap();
        let child = path.join("X").unwrap();
        assert_eq!(child.parent().unwrap(), path);
        assert!(path.join("a/b").is_err());
        assert_eq!(child.with_name("Z").unwrap().to_string(), "G/AM/Z");
    }

    #[test]
    fn prefix_relations() {
        let group = DataPath::parse("G").unwrap();
        let array = DataPath::parse("G/AM/X").unwrap();
        let sibling = DataPath::parse("GX").unwrap();
        assert!(array.is_descendant_of(&group));
        assert!(group.starts_with(&group));
        assert!(!group.is_descendant_of(&group));
        assert!(!sibling.starts_with(&group));
    }

    #[test]
    fn replace_prefix_rewrites_head() {
        let array = DataPath::parse("G/AM/X").unwrap();
        let moved = array
            .replace_prefix(&DataPath::parse("G/AM").unwrap(), &DataPath::parse("H").unwrap())
            .unwrap();
        assert_eq!(moved.to_string(), "H/X");
        assert!(array
            .replace_prefix(&DataPath::parse("Q").unwrap(), &DataPath::empty())
            .is_none());
    }

    #[test]
    fn serde_uses_text_form() {
        let path = DataPath::parse("G/AM/X").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"G/AM/X\"");
        let back: DataPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
