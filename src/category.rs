use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Semantic class assigned to an extracted patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Negative,
    LeftEye,
    RightEye,
    Nose,
    Mouth,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Negative,
        Category::LeftEye,
        Category::RightEye,
        Category::Nose,
        Category::Mouth,
    ];

    /// Number of entries in a label vector.
    pub const LABEL_LEN: usize = 4;

    /// Label vector written alongside every patch of this category.
    /// Negatives carry the all-zero vector.
    pub const fn label(self) -> [i64; Self::LABEL_LEN] {
        match self {
            Category::Negative => [0, 0, 0, 0],
            Category::LeftEye => [1, 0, 0, 0],
            Category::RightEye => [0, 1, 0, 0],
            Category::Nose => [0, 0, 1, 0],
            Category::Mouth => [0, 0, 0, 1],
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Category::Negative => "negative",
            Category::LeftEye => "left_eye",
            Category::RightEye => "right_eye",
            Category::Nose => "nose",
            Category::Mouth => "mouth",
        }
    }

    /// Position of this category in [`Category::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Recover the category from a stored label vector.
    pub fn from_label(label: &[i64]) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label()[..] == *label)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| Error::UnknownCategory(s.to_string()))
    }
}
