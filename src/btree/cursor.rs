/// Cursor: a (page, cell) position inside a leaf.
///
/// Produced by `BTree::find` and `BTree::table_start`. It holds no borrow of
/// the store, so every access takes the store explicitly. Leaves carry no
/// sibling pointer: advancing stops at the end of the current leaf. A cursor
/// must not be reused after its page has been split.
use crate::btree::node::{checked_leaf_num_cells, leaf_value};
use crate::error::{Result, RowDbError};
use crate::row::Row;
use crate::storage::page::PageNum;
use crate::storage::page_store::PageStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub page_num: PageNum,
    pub cell_num: u32,
    pub end_of_table: bool,
}

impl Cursor {
    /// Raw row bytes at the cursor.
    pub fn value<'a>(&self, pager: &'a mut impl PageStore) -> Result<&'a [u8]> {
        let page = pager.get_page(self.page_num)?;
        if self.cell_num >= checked_leaf_num_cells(page, self.page_num)? {
            return Err(RowDbError::CellOutOfBounds {
                page: self.page_num,
                cell: self.cell_num,
            });
        }
        Ok(leaf_value(page, self.cell_num))
    }

    /// Decoded row at the cursor.
    pub fn row(&self, pager: &mut impl PageStore) -> Result<Row> {
        Row::deserialize(self.value(pager)?)
    }

    pub fn advance(&mut self, pager: &mut impl PageStore) -> Result<()> {
        let page = pager.get_page(self.page_num)?;
        let num_cells = checked_leaf_num_cells(page, self.page_num)?;
        self.cell_num += 1;
        if self.cell_num >= num_cells {
            self.end_of_table = true;
        }
        Ok(())
    }
}
