//! rowdb: single-file B-tree row store
//!
//! A small storage engine with:
//! - 4096-byte pages cached in memory and written back on flush/close
//! - Leaf and internal B-tree nodes with a byte-exact on-disk layout
//! - Fixed-width 100-byte rows keyed by a `u32` id
//! - Binary search, leaf splitting and root promotion
//! - A line-oriented statement layer for the `rowdb` REPL

pub mod error;
pub mod config;
pub mod row;
pub mod storage;
pub mod btree;
pub mod statement;

use std::path::Path;

use crate::btree::cursor::Cursor;
use crate::btree::ops::BTree;
use crate::config::TableConfig;
use crate::error::Result;
use crate::row::Row;
use crate::storage::page_store::PageStore;
use crate::storage::pager::Pager;

/// Main table handle: one data file, one B-tree.
pub struct Table {
    pager: Pager,
    btree: BTree,
}

impl Table {
    /// Open (or create) a table with the default configuration.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_config(path, TableConfig::default())
    }

    pub fn open_with_config(path: &Path, config: TableConfig) -> Result<Self> {
        config.validate()?;
        let mut pager = Pager::open(path, &config)?;
        let btree = BTree::open(&mut pager, &config)?;
        Ok(Table { pager, btree })
    }

    pub fn find(&mut self, key: u32) -> Result<Cursor> {
        self.btree.find(&mut self.pager, key)
    }

    pub fn insert(&mut self, key: u32, row: &Row) -> Result<()> {
        self.btree.insert(&mut self.pager, key, row)
    }

    pub fn table_start(&mut self) -> Result<Cursor> {
        self.btree.table_start(&mut self.pager)
    }

    /// Row at the cursor.
    pub fn cursor_value(&mut self, cursor: &Cursor) -> Result<Row> {
        cursor.row(&mut self.pager)
    }

    pub fn advance(&mut self, cursor: &mut Cursor) -> Result<()> {
        cursor.advance(&mut self.pager)
    }

    /// Every row reachable by a cursor scan from the start of the table.
    pub fn select_all(&mut self) -> Result<Vec<Row>> {
        let mut cursor = self.table_start()?;
        let mut rows = Vec::new();
        while !cursor.end_of_table {
            rows.push(self.cursor_value(&cursor)?);
            self.advance(&mut cursor)?;
        }
        Ok(rows)
    }

    /// Indented rendering of the tree.
    pub fn dump_tree(&mut self) -> Result<String> {
        self.btree.dump(&mut self.pager)
    }

    pub fn leaf_max_cells(&self) -> u32 {
        self.btree.leaf_max_cells()
    }

    pub fn page_count(&self) -> u32 {
        self.pager.page_count()
    }

    /// Write all cached pages to disk without closing.
    pub fn flush(&mut self) -> Result<()> {
        self.pager.flush_all()
    }

    /// Flush all pages and release the file.
    pub fn close(self) -> Result<()> {
        self.pager.close()
    }
}
