//! Draft tags
//!
//! The editor collects tags as one comma-joined string. Stored drafts keep
//! them as an ordered set: trimmed, non-empty, first occurrence wins.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// An ordered, de-duplicated set of labels
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Tags(Vec<String>);

impl Tags {
    /// Parse the comma-joined form used by the editor
    ///
    /// # Examples
    ///
    /// ```
    /// use domain::Tags;
    ///
    /// let tags = Tags::parse("rust, web ,, rust");
    /// assert_eq!(tags.as_slice(), ["rust", "web"]);
    /// ```
    pub fn parse(raw: &str) -> Self {
        Self::from_labels(raw.split(','))
    }

    /// Build from individual labels, normalising as `parse` does
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tags = Vec::new();
        for label in labels {
            let label = label.as_ref().trim();
            if !label.is_empty() && !tags.iter().any(|t: &String| t == label) {
                tags.push(label.to_string());
            }
        }
        Self(tags)
    }

    /// Labels in insertion order
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Whether a label is present
    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|t| t == label)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

// Stored arrays are re-normalised on read
impl<'de> Deserialize<'de> for Tags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let labels = Vec::<String>::deserialize(deserializer)?;
        Ok(Self::from_labels(labels))
    }
}
