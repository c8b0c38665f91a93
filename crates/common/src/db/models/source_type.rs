//! Source type tags for authored entities

use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of authored entity a document mirrors.
///
/// The wire names double as queue-member prefixes, so they must never
/// contain `:`; keeping this a closed enum guarantees that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Story,
    Chapter,
    Scene,
    Beat,
    ProseBlock,
}

impl SourceType {
    /// All known source types
    pub const ALL: [SourceType; 5] = [
        SourceType::Story,
        SourceType::Chapter,
        SourceType::Scene,
        SourceType::Beat,
        SourceType::ProseBlock,
    ];

    /// Stable wire name (column value and queue-member prefix)
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Story => "story",
            SourceType::Chapter => "chapter",
            SourceType::Scene => "scene",
            SourceType::Beat => "beat",
            SourceType::ProseBlock => "prose_block",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "story" => Ok(SourceType::Story),
            "chapter" => Ok(SourceType::Chapter),
            "scene" => Ok(SourceType::Scene),
            "beat" => Ok(SourceType::Beat),
            "prose_block" => Ok(SourceType::ProseBlock),
            other => Err(AppError::InvalidSourceType {
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for st in SourceType::ALL {
            assert_eq!(st.as_str().parse::<SourceType>().unwrap(), st);
        }
    }

    #[test]
    fn test_rejects_unknown() {
        assert!("world".parse::<SourceType>().is_err());
        assert!("chapter:deleted".parse::<SourceType>().is_err());
    }

    #[test]
    fn test_no_colon_in_wire_names() {
        for st in SourceType::ALL {
            assert!(!st.as_str().contains(':'));
        }
    }
}
