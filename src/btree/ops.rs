/// B-tree operations: find, insert (with leaf split and root promotion), scan
/// start, and a debug dump.
///
/// The root always lives on page 0. Searching below an internal root and
/// splitting a non-root leaf are not supported; both surface as
/// `RowDbError::Unsupported` before any page is modified.
use tracing::{debug, warn};

use crate::btree::cursor::Cursor;
use crate::btree::node::*;
use crate::config::TableConfig;
use crate::error::{Result, RowDbError};
use crate::row::Row;
use crate::storage::page::{Page, PageNum};
use crate::storage::page_store::PageStore;

pub const ROOT_PAGE_NUM: PageNum = 0;

/// Maximum depth followed by `dump` before the tree is assumed to contain a
/// cycle.
const MAX_BTREE_DEPTH: usize = 64;

/// Pages a root split consumes: the split-off right leaf and the relocated
/// left child.
const ROOT_SPLIT_NEW_PAGES: u32 = 2;

/// Cell counts `(left, right)` after splitting a full leaf of capacity
/// `leaf_max_cells`. The left node takes the extra cell when the total is odd.
pub fn split_counts(leaf_max_cells: u32) -> (u32, u32) {
    let right = (leaf_max_cells + 1) / 2;
    let left = (leaf_max_cells + 1) - right;
    (left, right)
}

/// B-tree handle. Tracks the root page and the leaf capacity.
pub struct BTree {
    root_page_num: PageNum,
    leaf_max_cells: u32,
}

impl BTree {
    /// Open the tree stored in `pager`, bootstrapping an empty root leaf on
    /// page 0 when the store holds no pages.
    pub fn open(pager: &mut impl PageStore, config: &TableConfig) -> Result<Self> {
        if pager.page_count() == 0 {
            let root = pager.get_page(ROOT_PAGE_NUM)?;
            init_leaf(root);
            set_root(root, true);
            debug!(page = ROOT_PAGE_NUM, "initialized empty root leaf");
        }

        Ok(BTree {
            root_page_num: ROOT_PAGE_NUM,
            leaf_max_cells: config.leaf_max_cells,
        })
    }

    pub fn root_page_num(&self) -> PageNum {
        self.root_page_num
    }

    pub fn leaf_max_cells(&self) -> u32 {
        self.leaf_max_cells
    }

    /// Position of `key`: the cell holding it, or the cell it would be
    /// inserted at.
    pub fn find(&self, pager: &mut impl PageStore, key: u32) -> Result<Cursor> {
        let root = pager.get_page(self.root_page_num)?;
        match node_type(root, self.root_page_num)? {
            NodeType::Leaf => self.leaf_find(pager, self.root_page_num, key),
            NodeType::Internal => {
                warn!(key = key, "search below an internal root requested");
                Err(RowDbError::Unsupported(
                    "searching internal nodes is not implemented".into(),
                ))
            }
        }
    }

    /// Binary search over the sorted cells of a leaf.
    fn leaf_find(&self, pager: &mut impl PageStore, page_num: PageNum, key: u32) -> Result<Cursor> {
        let page = pager.get_page(page_num)?;
        let num_cells = checked_leaf_num_cells(page, page_num)?;

        let mut min_index = 0;
        let mut one_past_max_index = num_cells;
        while one_past_max_index != min_index {
            let index = min_index + (one_past_max_index - min_index) / 2;
            let key_at_index = leaf_key(page, index);
            match key.cmp(&key_at_index) {
                std::cmp::Ordering::Equal => {
                    return Ok(Cursor {
                        page_num,
                        cell_num: index,
                        end_of_table: false,
                    });
                }
                std::cmp::Ordering::Less => one_past_max_index = index,
                std::cmp::Ordering::Greater => min_index = index + 1,
            }
        }

        Ok(Cursor {
            page_num,
            cell_num: min_index,
            end_of_table: min_index == num_cells,
        })
    }

    /// Insert `row` under `key`. An existing key is rejected with
    /// `DuplicateKey` and the tree is left untouched.
    pub fn insert(&mut self, pager: &mut impl PageStore, key: u32, row: &Row) -> Result<()> {
        row.validate()?;
        let cursor = self.find(pager, key)?;

        let page = pager.get_page(cursor.page_num)?;
        if cursor.cell_num < leaf_num_cells(page) && leaf_key(page, cursor.cell_num) == key {
            return Err(RowDbError::DuplicateKey(key));
        }

        self.leaf_insert(pager, &cursor, key, row)
    }

    fn leaf_insert(
        &mut self,
        pager: &mut impl PageStore,
        cursor: &Cursor,
        key: u32,
        row: &Row,
    ) -> Result<()> {
        let page = pager.get_page(cursor.page_num)?;
        let num_cells = leaf_num_cells(page);
        if num_cells > self.leaf_max_cells {
            return Err(RowDbError::Corruption(format!(
                "leaf {} holds {} cells, capacity is {}",
                cursor.page_num, num_cells, self.leaf_max_cells
            )));
        }
        if num_cells == self.leaf_max_cells {
            return self.leaf_split_and_insert(pager, cursor, key, row);
        }

        leaf_shift_cells_right(page, cursor.cell_num, num_cells);
        set_leaf_key(page, cursor.cell_num, key);
        row.serialize(leaf_value_mut(page, cursor.cell_num));
        set_leaf_num_cells(page, num_cells + 1);
        Ok(())
    }

    /// Split a full leaf into two and insert the new cell into whichever half
    /// its position falls in.
    ///
    /// The `leaf_max_cells + 1` logical cells (existing ones plus the new one
    /// at `cursor.cell_num`) are walked from the highest index down. Indices
    /// below the left count stay in the old page, the rest move to a fresh
    /// page at `index % left_count`.
    fn leaf_split_and_insert(
        &mut self,
        pager: &mut impl PageStore,
        cursor: &Cursor,
        key: u32,
        row: &Row,
    ) -> Result<()> {
        let old_page_num = cursor.page_num;
        let old = pager.get_page(old_page_num)?.clone();

        if !is_root(&old) {
            warn!(page = old_page_num, key = key, "split of a non-root leaf requested");
            return Err(RowDbError::Unsupported(format!(
                "splitting non-root leaf {} requires updating its parent, which is not implemented",
                old_page_num
            )));
        }

        let new_page_num = pager.allocate_page_number();
        let max_pages = pager.max_pages();
        if new_page_num.saturating_add(ROOT_SPLIT_NEW_PAGES) > max_pages {
            return Err(RowDbError::PageLimitExceeded {
                page: new_page_num.saturating_add(ROOT_SPLIT_NEW_PAGES - 1),
                max_pages,
            });
        }

        let mut new_cell = [0u8; LEAF_NODE_CELL_SIZE];
        new_cell[LEAF_NODE_KEY_OFFSET..LEAF_NODE_KEY_OFFSET + LEAF_NODE_KEY_SIZE]
            .copy_from_slice(&key.to_le_bytes());
        row.serialize(&mut new_cell[LEAF_NODE_VALUE_OFFSET..]);

        let (left_count, right_count) = split_counts(self.leaf_max_cells);
        let mut right = Page::new();
        init_leaf(&mut right);

        let left = pager.get_page(old_page_num)?;
        for i in (0..=self.leaf_max_cells).rev() {
            let cell: &[u8] = if i == cursor.cell_num {
                &new_cell
            } else if i > cursor.cell_num {
                leaf_cell(&old, i - 1)
            } else {
                leaf_cell(&old, i)
            };

            let index_within_node = i % left_count;
            if i >= left_count {
                set_leaf_cell(&mut right, index_within_node, cell);
            } else {
                set_leaf_cell(left, index_within_node, cell);
            }
        }
        set_leaf_num_cells(left, left_count);
        set_leaf_num_cells(&mut right, right_count);

        *pager.get_page(new_page_num)? = right;
        debug!(
            left = old_page_num,
            right = new_page_num,
            left_count,
            right_count,
            "split leaf"
        );

        self.create_new_root(pager, new_page_num)
    }

    /// Promote after a root split: the old root's bytes move to a fresh page
    /// (the left child) and page 0 becomes an internal node over the two
    /// halves.
    fn create_new_root(&mut self, pager: &mut impl PageStore, right_child_page_num: PageNum) -> Result<()> {
        let root_image = pager.get_page(self.root_page_num)?.clone();
        let left_child_page_num = pager.allocate_page_number();

        let left_child = pager.get_page(left_child_page_num)?;
        *left_child = root_image;
        set_root(left_child, false);
        let left_child_max_key = max_key(left_child, left_child_page_num)?.ok_or_else(|| {
            RowDbError::Corruption(format!(
                "left child {} is empty after split",
                left_child_page_num
            ))
        })?;

        let root = pager.get_page(self.root_page_num)?;
        init_internal(root);
        set_root(root, true);
        set_internal_num_keys(root, 1);
        set_internal_child(root, 0, left_child_page_num);
        set_internal_key(root, 0, left_child_max_key);
        set_internal_right_child(root, right_child_page_num);

        debug!(
            root = self.root_page_num,
            left = left_child_page_num,
            right = right_child_page_num,
            key = left_child_max_key,
            "promoted new internal root"
        );
        Ok(())
    }

    /// Cursor at the first cell of the root leaf.
    pub fn table_start(&self, pager: &mut impl PageStore) -> Result<Cursor> {
        let root = pager.get_page(self.root_page_num)?;
        match node_type(root, self.root_page_num)? {
            NodeType::Leaf => Ok(Cursor {
                page_num: self.root_page_num,
                cell_num: 0,
                end_of_table: checked_leaf_num_cells(root, self.root_page_num)? == 0,
            }),
            NodeType::Internal => {
                warn!("scan across leaves requested");
                Err(RowDbError::Unsupported(
                    "scanning a tree with an internal root is not implemented".into(),
                ))
            }
        }
    }

    /// Render the tree as indented text, one node or key per line.
    pub fn dump(&self, pager: &mut impl PageStore) -> Result<String> {
        let mut out = String::new();
        dump_node(pager, self.root_page_num, 0, &mut out)?;
        Ok(out)
    }
}

fn indent(out: &mut String, level: usize) {
    out.push_str(&"  ".repeat(level));
}

fn dump_node(pager: &mut impl PageStore, page_num: PageNum, depth: usize, out: &mut String) -> Result<()> {
    if depth > MAX_BTREE_DEPTH {
        return Err(RowDbError::Corruption(
            "B-tree depth exceeds maximum (possible cycle)".into(),
        ));
    }

    let page: &Page = pager.get_page(page_num)?;
    match node_type(page, page_num)? {
        NodeType::Leaf => {
            let num_cells = checked_leaf_num_cells(page, page_num)?;
            indent(out, depth);
            out.push_str(&format!("- leaf (size {})\n", num_cells));
            for i in 0..num_cells {
                indent(out, depth + 1);
                out.push_str(&format!("- {}\n", leaf_key(page, i)));
            }
        }
        NodeType::Internal => {
            let num_keys = internal_num_keys(page);
            if num_keys > INTERNAL_NODE_MAX_CELLS {
                return Err(RowDbError::Corruption(format!(
                    "internal node {} claims {} keys",
                    page_num, num_keys
                )));
            }
            indent(out, depth);
            out.push_str(&format!("- internal (size {})\n", num_keys));

            // Collect first: descending needs the store again.
            let mut entries = Vec::with_capacity(num_keys as usize);
            for i in 0..num_keys {
                entries.push((internal_child(page, i)?, internal_key(page, i)));
            }
            let right_child = internal_right_child(page);

            for (child, key) in entries {
                dump_node(pager, child, depth + 1, out)?;
                indent(out, depth + 1);
                out.push_str(&format!("- key {}\n", key));
            }
            dump_node(pager, right_child, depth + 1, out)?;
        }
    }
    Ok(())
}
