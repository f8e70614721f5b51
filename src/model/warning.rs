//! Per-page conversion warnings.

use serde::{Deserialize, Serialize};

/// Problems with character-level data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharWarning {
    /// The input carried no character boxes
    Missing,
    /// Character boxes were present but could not be used
    Invalid,
}

/// Warning descriptor returned with every converted page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWarning {
    pub char_warning: Option<CharWarning>,
}

impl PageWarning {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn char(warning: CharWarning) -> Self {
        Self {
            char_warning: Some(warning),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.char_warning.is_none()
    }
}

/// Document-wide character warning, if more than half of the pages with a
/// recorded warning lack usable character data.
///
/// Pages that have not been converted yet (`None`) are not counted.
pub fn summarize_char_warnings(warnings: &[Option<PageWarning>]) -> Option<CharWarning> {
    let recorded: Vec<&PageWarning> = warnings.iter().flatten().collect();
    if recorded.is_empty() {
        return None;
    }

    let count = |kind: CharWarning| {
        recorded
            .iter()
            .filter(|w| w.char_warning == Some(kind))
            .count()
    };

    let half = recorded.len() as f64 / 2.0;
    if count(CharWarning::Invalid) as f64 > half {
        Some(CharWarning::Invalid)
    } else if count(CharWarning::Missing) as f64 > half {
        Some(CharWarning::Missing)
    } else {
        None
    }
}
