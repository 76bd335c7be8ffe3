use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between the segments of a canonical reference string.
pub const SEPARATOR: char = '.';

/// A reference to a program variable or one of its (nested) fields.
///
/// `meta.x` is the field `x` of the variable `meta`. Ordering follows the
/// segments, so all fields of one variable sort next to each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateRef {
    segments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid state reference '{0}'")]
pub struct InvalidStateRef(pub String);

impl StateRef {
    pub fn new(root: &str) -> Self {
        Self {
            segments: vec![root.to_string()],
        }
    }

    pub fn parse(s: &str) -> Result<Self, InvalidStateRef> {
        let segments: Vec<String> = s.split(SEPARATOR).map(str::to_string).collect();
        if segments.iter().any(|seg| seg.is_empty()) {
            return Err(InvalidStateRef(s.to_string()));
        }
        Ok(Self { segments })
    }

    /// The reference to field `name` of this one.
    pub fn member(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    pub fn root(&self) -> &str {
        &self.segments[0]
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True for strict descendants of `root`, never for `root` itself.
    pub fn is_rooted_at(&self, root: &StateRef) -> bool {
        self.segments.len() > root.segments.len() && self.segments.starts_with(&root.segments)
    }
}

impl fmt::Display for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for seg in &self.segments {
            if !first {
                write!(f, "{SEPARATOR}")?;
            }
            f.write_str(seg)?;
            first = false;
        }
        Ok(())
    }
}

impl std::str::FromStr for StateRef {
    type Err = InvalidStateRef;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StateRef::parse(s)
    }
}

impl Serialize for StateRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StateRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        StateRef::parse(&s).map_err(serde::de::Error::custom)
    }
}
