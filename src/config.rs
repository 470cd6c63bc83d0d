use crate::btree::node::LEAF_NODE_MAX_CELLS;
use crate::error::{Result, RowDbError};

/// Upper bound on the number of pages a table may cache (and so hold).
pub const TABLE_MAX_PAGES: u32 = 100;

/// Knobs for opening a table.
///
/// `leaf_max_cells` must be the value the file was written with; a smaller
/// capacity is useful for exercising splits on small data sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableConfig {
    pub max_pages: u32,
    pub leaf_max_cells: u32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            max_pages: TABLE_MAX_PAGES,
            leaf_max_cells: LEAF_NODE_MAX_CELLS,
        }
    }
}

impl TableConfig {
    pub fn with_leaf_max_cells(mut self, leaf_max_cells: u32) -> Self {
        self.leaf_max_cells = leaf_max_cells;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_pages == 0 {
            return Err(RowDbError::InvalidConfig(
                "max_pages must be at least 1".into(),
            ));
        }
        if self.leaf_max_cells == 0 || self.leaf_max_cells > LEAF_NODE_MAX_CELLS {
            return Err(RowDbError::InvalidConfig(format!(
                "leaf_max_cells must be between 1 and {}, got {}",
                LEAF_NODE_MAX_CELLS, self.leaf_max_cells
            )));
        }
        Ok(())
    }
}
