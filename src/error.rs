use thiserror::Error;

use crate::storage::page::PageNum;

#[derive(Error, Debug)]
pub enum RowDbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data corruption: {0}")]
    Corruption(String),

    #[error("Short read: page {page} returned {read} of {expected} bytes")]
    ShortRead {
        page: PageNum,
        read: usize,
        expected: usize,
    },

    #[error("Page limit exceeded: page {page} is beyond the bound of {max_pages} pages")]
    PageLimitExceeded { page: PageNum, max_pages: u32 },

    #[error("Tried to flush page {0}, which was never loaded")]
    PageNotCached(PageNum),

    #[error("Invalid node type tag {tag} on page {page}")]
    InvalidNodeType { page: PageNum, tag: u8 },

    #[error("Child index {index} out of bounds for internal node with {key_count} keys")]
    ChildIndexOutOfBounds { index: u32, key_count: u32 },

    #[error("Cell {cell} out of bounds on page {page}")]
    CellOutOfBounds { page: PageNum, cell: u32 },

    #[error("Duplicate key: {0}")]
    DuplicateKey(u32),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("String too long: {field} is limited to {max} bytes")]
    StringTooLong { field: &'static str, max: usize },

    #[error("Negative id not allowed")]
    NegativeId,

    #[error("Syntax error: {0}")]
    Parse(String),

    #[error("Unrecognized statement: {0}")]
    UnrecognizedStatement(String),

    #[error("Unrecognized command: {0}")]
    UnrecognizedCommand(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RowDbError {
    /// Errors a caller can report and move past. They are all raised before
    /// any page is touched. Everything else means the in-memory pages may no
    /// longer match what a correct run would hold.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RowDbError::DuplicateKey(_)
                | RowDbError::Unsupported(_)
                | RowDbError::StringTooLong { .. }
                | RowDbError::NegativeId
                | RowDbError::Parse(_)
                | RowDbError::UnrecognizedStatement(_)
                | RowDbError::UnrecognizedCommand(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RowDbError>;
