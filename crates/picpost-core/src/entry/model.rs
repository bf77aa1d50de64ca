//! Entry domain model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One record of the public index file.
///
/// The JSON shape is consumed by the public site, hence the camelCase field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Positive, unique, monotonically assigned identifier
    pub id: u64,
    /// Site-relative image path
    pub image_path: String,
    /// May be empty
    #[serde(default)]
    pub title: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// URL or empty
    #[serde(default)]
    pub link: String,
}

/// The editable fields of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryField {
    Date,
    Title,
    Link,
}

impl EntryField {
    pub const ALL: [EntryField; 3] = [EntryField::Date, EntryField::Title, EntryField::Link];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Title => "title",
            Self::Link => "link",
        }
    }
}

impl fmt::Display for EntryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date" => Ok(Self::Date),
            "title" => Ok(Self::Title),
            "link" => Ok(Self::Link),
            other => Err(format!("unknown entry field '{other}'")),
        }
    }
}

/// A validated single-field update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPatch {
    pub field: EntryField,
    pub value: String,
}

impl EntryPatch {
    pub fn new(field: EntryField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }

    pub fn apply(&self, entry: &mut Entry) {
        let slot = match self.field {
            EntryField::Date => &mut entry.date,
            EntryField::Title => &mut entry.title,
            EntryField::Link => &mut entry.link,
        };
        slot.clone_from(&self.value);
    }
}
