pub mod page;
pub mod page_store;
pub mod pager;
