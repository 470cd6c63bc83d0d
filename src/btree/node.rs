/// B-tree node layout over raw pages.
///
/// Common header (6 bytes):
///   [node_type: u8] [is_root: u8] [parent_pointer: u32]
///
/// Leaf node:
///   header: common + [cell_count: u32]                    (10 bytes)
///   cell:   [key: u32] [row: ROW_SIZE bytes]              (104 bytes)
///
/// Internal node:
///   header: common + [key_count: u32] [right_child: u32]  (14 bytes)
///   cell:   [child: u32] [key: u32]                       (8 bytes)
///
/// Key i of an internal node is the largest key under child i; the right
/// child holds every key greater than the last one.
use crate::error::{Result, RowDbError};
use crate::row::ROW_SIZE;
use crate::storage::page::{Page, PageNum, PAGE_SIZE};

// Common header
pub const NODE_TYPE_SIZE: usize = 1;
pub const NODE_TYPE_OFFSET: usize = 0;
pub const IS_ROOT_SIZE: usize = 1;
pub const IS_ROOT_OFFSET: usize = NODE_TYPE_OFFSET + NODE_TYPE_SIZE;
pub const PARENT_POINTER_SIZE: usize = 4;
pub const PARENT_POINTER_OFFSET: usize = IS_ROOT_OFFSET + IS_ROOT_SIZE;
pub const COMMON_NODE_HEADER_SIZE: usize = NODE_TYPE_SIZE + IS_ROOT_SIZE + PARENT_POINTER_SIZE;

// Leaf header and body
pub const LEAF_NODE_NUM_CELLS_SIZE: usize = 4;
pub const LEAF_NODE_NUM_CELLS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
pub const LEAF_NODE_HEADER_SIZE: usize = COMMON_NODE_HEADER_SIZE + LEAF_NODE_NUM_CELLS_SIZE;
pub const LEAF_NODE_KEY_SIZE: usize = 4;
pub const LEAF_NODE_KEY_OFFSET: usize = 0;
pub const LEAF_NODE_VALUE_SIZE: usize = ROW_SIZE;
pub const LEAF_NODE_VALUE_OFFSET: usize = LEAF_NODE_KEY_OFFSET + LEAF_NODE_KEY_SIZE;
pub const LEAF_NODE_CELL_SIZE: usize = LEAF_NODE_KEY_SIZE + LEAF_NODE_VALUE_SIZE;
pub const LEAF_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_NODE_HEADER_SIZE;
pub const LEAF_NODE_MAX_CELLS: u32 = (LEAF_NODE_SPACE_FOR_CELLS / LEAF_NODE_CELL_SIZE) as u32;
pub const LEAF_NODE_RIGHT_SPLIT_COUNT: u32 = (LEAF_NODE_MAX_CELLS + 1) / 2;
pub const LEAF_NODE_LEFT_SPLIT_COUNT: u32 = (LEAF_NODE_MAX_CELLS + 1) - LEAF_NODE_RIGHT_SPLIT_COUNT;

// Internal header and body
pub const INTERNAL_NODE_NUM_KEYS_SIZE: usize = 4;
pub const INTERNAL_NODE_NUM_KEYS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
pub const INTERNAL_NODE_RIGHT_CHILD_SIZE: usize = 4;
pub const INTERNAL_NODE_RIGHT_CHILD_OFFSET: usize =
    INTERNAL_NODE_NUM_KEYS_OFFSET + INTERNAL_NODE_NUM_KEYS_SIZE;
pub const INTERNAL_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + INTERNAL_NODE_NUM_KEYS_SIZE + INTERNAL_NODE_RIGHT_CHILD_SIZE;
pub const INTERNAL_NODE_CHILD_SIZE: usize = 4;
pub const INTERNAL_NODE_KEY_SIZE: usize = 4;
pub const INTERNAL_NODE_CELL_SIZE: usize = INTERNAL_NODE_CHILD_SIZE + INTERNAL_NODE_KEY_SIZE;
pub const INTERNAL_NODE_MAX_CELLS: u32 =
    ((PAGE_SIZE - INTERNAL_NODE_HEADER_SIZE) / INTERNAL_NODE_CELL_SIZE) as u32;

const NODE_TYPE_INTERNAL: u8 = 0;
const NODE_TYPE_LEAF: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Internal,
    Leaf,
}

// --- Common header ---

/// Get the node type. `page_num` is only used for error reporting.
pub fn node_type(page: &Page, page_num: PageNum) -> Result<NodeType> {
    match page.read_u8(NODE_TYPE_OFFSET) {
        NODE_TYPE_INTERNAL => Ok(NodeType::Internal),
        NODE_TYPE_LEAF => Ok(NodeType::Leaf),
        tag => Err(RowDbError::InvalidNodeType {
            page: page_num,
            tag,
        }),
    }
}

pub fn set_node_type(page: &mut Page, node_type: NodeType) {
    let tag = match node_type {
        NodeType::Internal => NODE_TYPE_INTERNAL,
        NodeType::Leaf => NODE_TYPE_LEAF,
    };
    page.write_u8(NODE_TYPE_OFFSET, tag);
}

pub fn is_root(page: &Page) -> bool {
    page.read_u8(IS_ROOT_OFFSET) != 0
}

pub fn set_root(page: &mut Page, is_root: bool) {
    page.write_u8(IS_ROOT_OFFSET, is_root as u8);
}

pub fn parent_pointer(page: &Page) -> PageNum {
    page.read_u32(PARENT_POINTER_OFFSET)
}

pub fn set_parent_pointer(page: &mut Page, parent: PageNum) {
    page.write_u32(PARENT_POINTER_OFFSET, parent);
}

// --- Leaf node ---

pub fn leaf_num_cells(page: &Page) -> u32 {
    page.read_u32(LEAF_NODE_NUM_CELLS_OFFSET)
}

/// Cell count read from a page that came off disk; a count past the page
/// capacity is `Corruption`.
pub fn checked_leaf_num_cells(page: &Page, page_num: PageNum) -> Result<u32> {
    let num_cells = leaf_num_cells(page);
    if num_cells > LEAF_NODE_MAX_CELLS {
        return Err(RowDbError::Corruption(format!(
            "leaf {} claims {} cells",
            page_num, num_cells
        )));
    }
    Ok(num_cells)
}

pub fn set_leaf_num_cells(page: &mut Page, count: u32) {
    page.write_u32(LEAF_NODE_NUM_CELLS_OFFSET, count);
}

fn leaf_cell_offset(cell_num: u32) -> usize {
    debug_assert!(cell_num < LEAF_NODE_MAX_CELLS);
    LEAF_NODE_HEADER_SIZE + cell_num as usize * LEAF_NODE_CELL_SIZE
}

/// Raw bytes (key + row) of leaf cell `cell_num`.
pub fn leaf_cell(page: &Page, cell_num: u32) -> &[u8] {
    page.slice(leaf_cell_offset(cell_num), LEAF_NODE_CELL_SIZE)
}

pub fn set_leaf_cell(page: &mut Page, cell_num: u32, cell: &[u8]) {
    page.slice_mut(leaf_cell_offset(cell_num), LEAF_NODE_CELL_SIZE)
        .copy_from_slice(cell);
}

pub fn leaf_key(page: &Page, cell_num: u32) -> u32 {
    page.read_u32(leaf_cell_offset(cell_num) + LEAF_NODE_KEY_OFFSET)
}

pub fn set_leaf_key(page: &mut Page, cell_num: u32, key: u32) {
    page.write_u32(leaf_cell_offset(cell_num) + LEAF_NODE_KEY_OFFSET, key);
}

pub fn leaf_value(page: &Page, cell_num: u32) -> &[u8] {
    page.slice(
        leaf_cell_offset(cell_num) + LEAF_NODE_VALUE_OFFSET,
        LEAF_NODE_VALUE_SIZE,
    )
}

pub fn leaf_value_mut(page: &mut Page, cell_num: u32) -> &mut [u8] {
    page.slice_mut(
        leaf_cell_offset(cell_num) + LEAF_NODE_VALUE_OFFSET,
        LEAF_NODE_VALUE_SIZE,
    )
}

/// Move cells `[cell_num, num_cells)` one slot up to open a gap at
/// `cell_num`. The caller guarantees `num_cells < LEAF_NODE_MAX_CELLS`.
pub fn leaf_shift_cells_right(page: &mut Page, cell_num: u32, num_cells: u32) {
    if cell_num >= num_cells {
        return;
    }
    let start = leaf_cell_offset(cell_num);
    let end = leaf_cell_offset(num_cells);
    // memmove semantics: overlapping ranges are copied high to low.
    page.data.copy_within(start..end, start + LEAF_NODE_CELL_SIZE);
}

/// Reset a page to an empty, non-root leaf.
pub fn init_leaf(page: &mut Page) {
    set_node_type(page, NodeType::Leaf);
    set_root(page, false);
    set_parent_pointer(page, 0);
    set_leaf_num_cells(page, 0);
}

// --- Internal node ---

pub fn internal_num_keys(page: &Page) -> u32 {
    page.read_u32(INTERNAL_NODE_NUM_KEYS_OFFSET)
}

pub fn set_internal_num_keys(page: &mut Page, count: u32) {
    page.write_u32(INTERNAL_NODE_NUM_KEYS_OFFSET, count);
}

pub fn internal_right_child(page: &Page) -> PageNum {
    page.read_u32(INTERNAL_NODE_RIGHT_CHILD_OFFSET)
}

pub fn set_internal_right_child(page: &mut Page, child: PageNum) {
    page.write_u32(INTERNAL_NODE_RIGHT_CHILD_OFFSET, child);
}

fn internal_cell_offset(cell_num: u32) -> usize {
    debug_assert!(cell_num < INTERNAL_NODE_MAX_CELLS);
    INTERNAL_NODE_HEADER_SIZE + cell_num as usize * INTERNAL_NODE_CELL_SIZE
}

/// Child `child_num` of an internal node; `child_num == key_count` is the
/// right child.
pub fn internal_child(page: &Page, child_num: u32) -> Result<PageNum> {
    let key_count = internal_num_keys(page);
    if child_num > key_count {
        return Err(RowDbError::ChildIndexOutOfBounds {
            index: child_num,
            key_count,
        });
    }
    if child_num == key_count {
        Ok(internal_right_child(page))
    } else {
        Ok(page.read_u32(internal_cell_offset(child_num)))
    }
}

/// Set the child pointer of cell `cell_num` (not the right child).
pub fn set_internal_child(page: &mut Page, cell_num: u32, child: PageNum) {
    page.write_u32(internal_cell_offset(cell_num), child);
}

pub fn internal_key(page: &Page, key_num: u32) -> u32 {
    page.read_u32(internal_cell_offset(key_num) + INTERNAL_NODE_CHILD_SIZE)
}

pub fn set_internal_key(page: &mut Page, key_num: u32, key: u32) {
    page.write_u32(
        internal_cell_offset(key_num) + INTERNAL_NODE_CHILD_SIZE,
        key,
    );
}

/// Reset a page to an empty, non-root internal node.
pub fn init_internal(page: &mut Page) {
    set_node_type(page, NodeType::Internal);
    set_root(page, false);
    set_parent_pointer(page, 0);
    set_internal_num_keys(page, 0);
    set_internal_right_child(page, 0);
}

/// Largest key recorded in the node itself: the last leaf cell, or the last
/// internal cell. The right child of an internal node is not consulted.
/// `None` for an empty node.
pub fn max_key(page: &Page, page_num: PageNum) -> Result<Option<u32>> {
    Ok(match node_type(page, page_num)? {
        NodeType::Leaf => match leaf_num_cells(page) {
            0 => None,
            n => Some(leaf_key(page, n - 1)),
        },
        NodeType::Internal => match internal_num_keys(page) {
            0 => None,
            n => Some(internal_key(page, n - 1)),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_constants() {
        assert_eq!(COMMON_NODE_HEADER_SIZE, 6);
        assert_eq!(LEAF_NODE_HEADER_SIZE, 10);
        assert_eq!(LEAF_NODE_CELL_SIZE, 104);
        assert_eq!(LEAF_NODE_SPACE_FOR_CELLS, 4086);
        assert_eq!(LEAF_NODE_MAX_CELLS, 39);
        assert_eq!(INTERNAL_NODE_HEADER_SIZE, 14);
        assert_eq!(INTERNAL_NODE_CELL_SIZE, 8);
        assert_eq!(INTERNAL_NODE_MAX_CELLS, 510);
    }

    #[test]
    fn test_leaf_node() {
        let mut page = Page::new();
        set_root(&mut page, true);
        set_leaf_num_cells(&mut page, 5);
        init_leaf(&mut page);

        assert_eq!(node_type(&page, 0).unwrap(), NodeType::Leaf);
        assert!(!is_root(&page));
        assert_eq!(leaf_num_cells(&page), 0);
        assert_eq!(max_key(&page, 0).unwrap(), None);

        set_leaf_key(&mut page, 0, 3);
        leaf_value_mut(&mut page, 0).fill(0xAB);
        set_leaf_key(&mut page, 1, 8);
        set_leaf_num_cells(&mut page, 2);

        assert_eq!(leaf_key(&page, 0), 3);
        assert!(leaf_value(&page, 0).iter().all(|&b| b == 0xAB));
        assert_eq!(max_key(&page, 0).unwrap(), Some(8));

        // Byte-exact placement of the second cell.
        let offset = LEAF_NODE_HEADER_SIZE + LEAF_NODE_CELL_SIZE;
        assert_eq!(page.read_u32(offset), 8);
        assert_eq!(page.read_u8(NODE_TYPE_OFFSET), 1);
    }

    #[test]
    fn test_copy_leaf_cell() {
        let mut src = Page::new();
        init_leaf(&mut src);
        set_leaf_key(&mut src, 2, 77);
        leaf_value_mut(&mut src, 2)[0] = 9;

        let mut dst = Page::new();
        init_leaf(&mut dst);
        set_leaf_cell(&mut dst, 0, leaf_cell(&src, 2));
        assert_eq!(leaf_key(&dst, 0), 77);
        assert_eq!(leaf_value(&dst, 0)[0], 9);
    }

    #[test]
    fn test_shift_cells_right() {
        let mut page = Page::new();
        init_leaf(&mut page);
        for (i, key) in [10u32, 20, 30].into_iter().enumerate() {
            set_leaf_key(&mut page, i as u32, key);
            leaf_value_mut(&mut page, i as u32)[0] = key as u8;
        }

        leaf_shift_cells_right(&mut page, 1, 3);
        assert_eq!(leaf_key(&page, 0), 10);
        assert_eq!(leaf_key(&page, 2), 20);
        assert_eq!(leaf_key(&page, 3), 30);
        assert_eq!(leaf_value(&page, 3)[0], 30);
        assert_eq!(leaf_value(&page, 2)[0], 20);

        // Nothing to move when inserting at the end.
        let before = page.clone();
        leaf_shift_cells_right(&mut page, 4, 4);
        assert_eq!(page, before);
    }

    #[test]
    fn test_internal_node() {
        let mut page = Page::new();
        init_internal(&mut page);
        set_root(&mut page, true);

        assert_eq!(node_type(&page, 0).unwrap(), NodeType::Internal);
        assert!(is_root(&page));
        assert_eq!(max_key(&page, 0).unwrap(), None);

        set_internal_num_keys(&mut page, 2);
        set_internal_child(&mut page, 0, 10);
        set_internal_key(&mut page, 0, 5);
        set_internal_child(&mut page, 1, 20);
        set_internal_key(&mut page, 1, 9);
        set_internal_right_child(&mut page, 30);

        assert_eq!(internal_child(&page, 0).unwrap(), 10);
        assert_eq!(internal_child(&page, 1).unwrap(), 20);
        assert_eq!(internal_child(&page, 2).unwrap(), 30);
        assert_eq!(internal_key(&page, 1), 9);
        assert_eq!(max_key(&page, 0).unwrap(), Some(9));

        assert_eq!(page.read_u32(INTERNAL_NODE_RIGHT_CHILD_OFFSET), 30);
        assert_eq!(page.read_u32(INTERNAL_NODE_HEADER_SIZE), 10);
        assert_eq!(page.read_u32(INTERNAL_NODE_HEADER_SIZE + 4), 5);
    }

    #[test]
    fn test_internal_child_out_of_bounds() {
        let mut page = Page::new();
        init_internal(&mut page);
        set_internal_num_keys(&mut page, 1);

        let err = internal_child(&page, 2).unwrap_err();
        assert!(matches!(
            err,
            RowDbError::ChildIndexOutOfBounds {
                index: 2,
                key_count: 1
            }
        ));
    }

    #[test]
    fn test_invalid_node_type() {
        let mut page = Page::new();
        page.write_u8(NODE_TYPE_OFFSET, 9);
        assert!(matches!(
            node_type(&page, 4),
            Err(RowDbError::InvalidNodeType { page: 4, tag: 9 })
        ));
    }

    #[test]
    fn test_parent_pointer() {
        let mut page = Page::new();
        set_parent_pointer(&mut page, 12);
        assert_eq!(parent_pointer(&page), 12);
        init_leaf(&mut page);
        assert_eq!(parent_pointer(&page), 0);
    }
}
