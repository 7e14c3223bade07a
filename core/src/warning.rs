//! Warning lists returned alongside otherwise successful payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A structured notice from the service. A non-empty list of these on a
/// success envelope means the call did not do what was asked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Warning {
    pub item: String,
    #[serde(rename = "itemid")]
    pub item_id: i64,
    #[serde(rename = "warningcode")]
    pub warning_code: String,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "item: {}, itemID: {}, warningCode: {}, message: {}",
            self.item, self.item_id, self.warning_code, self.message
        )
    }
}

/// An ordered warning list, reported as a single error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Warnings(pub Vec<Warning>);

impl Warnings {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Warning> {
        self.0.iter()
    }
}

impl fmt::Display for Warnings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, warning) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{warning}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Warnings {}
