use crate::error::Result;
use crate::storage::page::{Page, PageNum};

/// Abstraction over the page cache.
///
/// Implemented by `Pager`. Pages handed out are mutated in place and persisted
/// only when the store flushes them.
pub trait PageStore {
    /// Cached buffer for `page_num`, loading or zero-filling it on first access.
    fn get_page(&mut self, page_num: PageNum) -> Result<&mut Page>;
    /// Next never-used page number. Does not materialize the page.
    fn allocate_page_number(&self) -> PageNum;
    fn page_count(&self) -> u32;
    fn max_pages(&self) -> u32;
}
