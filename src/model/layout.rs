//! Layout and table annotations.
//!
//! These live beside the text tree rather than inside it.

use serde::{Deserialize, Serialize};

use super::BBox;

/// One detected table region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutTable {
    /// Table box in page pixel space
    pub bbox: BBox,
    /// Column boxes, left to right (may be empty when unknown)
    pub columns: Vec<BBox>,
}

impl LayoutTable {
    pub fn new(bbox: BBox) -> Self {
        Self {
            bbox,
            columns: Vec::new(),
        }
    }
}

/// All table annotations for one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutDataTable {
    pub tables: Vec<LayoutTable>,
}

impl LayoutDataTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn add_table(&mut self, table: LayoutTable) {
        self.tables.push(table);
    }
}
