use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::TableConfig;
use crate::error::{Result, RowDbError};
use crate::storage::page::{Page, PageNum, PAGE_SIZE};
use crate::storage::page_store::PageStore;

/// Page cache over a single data file.
///
/// Page `n` lives at byte offset `n * PAGE_SIZE`. Pages are loaded on first
/// access and written back only by `flush`, `flush_all` or `close`. The cache
/// never evicts: touching a page at or past `max_pages` is an error.
pub struct Pager {
    file: File,
    path: PathBuf,
    /// Pages physically present in the file.
    file_pages: u32,
    page_count: u32,
    max_pages: u32,
    cache: HashMap<PageNum, Page>,
}

impl Pager {
    /// Open (or create) the data file.
    pub fn open(path: &Path, config: &TableConfig) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let file_len = file.metadata()?.len();
        if file_len % PAGE_SIZE as u64 != 0 {
            return Err(RowDbError::Corruption(format!(
                "file length {} is not a whole number of {}-byte pages",
                file_len, PAGE_SIZE
            )));
        }
        let file_pages = u32::try_from(file_len / PAGE_SIZE as u64).map_err(|_| {
            RowDbError::Corruption(format!("file length {} is too large", file_len))
        })?;

        info!(path = %path.display(), pages = file_pages, "opened data file");

        Ok(Pager {
            file,
            path: path.to_path_buf(),
            file_pages,
            page_count: file_pages,
            max_pages: config.max_pages,
            cache: HashMap::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_cached(&self, page_num: PageNum) -> bool {
        self.cache.contains_key(&page_num)
    }

    /// Write one cached page back to its slot in the file.
    pub fn flush(&mut self, page_num: PageNum) -> Result<()> {
        let page = self
            .cache
            .get(&page_num)
            .ok_or(RowDbError::PageNotCached(page_num))?;

        self.file
            .seek(SeekFrom::Start(page_offset(page_num)))?;
        self.file.write_all(page.as_bytes())?;
        self.file_pages = self.file_pages.max(page_num + 1);
        Ok(())
    }

    /// Flush every cached page and sync the file.
    pub fn flush_all(&mut self) -> Result<()> {
        let mut flushed = 0u32;
        for page_num in 0..self.page_count {
            if !self.is_cached(page_num) {
                continue;
            }
            self.flush(page_num)?;
            flushed += 1;
        }
        self.file.sync_all()?;
        debug!(pages = flushed, "flushed cached pages");
        Ok(())
    }

    /// Flush everything and release the file.
    pub fn close(mut self) -> Result<()> {
        self.flush_all()?;
        info!(path = %self.path().display(), pages = self.page_count, "closed data file");
        Ok(())
    }

    fn read_page_from_disk(file: &mut File, page_num: PageNum) -> Result<Page> {
        file.seek(SeekFrom::Start(page_offset(page_num)))?;

        let mut data = [0u8; PAGE_SIZE];
        let read = read_full(file, &mut data)?;
        if read != PAGE_SIZE {
            return Err(RowDbError::ShortRead {
                page: page_num,
                read,
                expected: PAGE_SIZE,
            });
        }
        debug!(page = page_num, "loaded page from disk");
        Ok(Page::from_bytes(data))
    }
}

impl PageStore for Pager {
    fn get_page(&mut self, page_num: PageNum) -> Result<&mut Page> {
        if page_num >= self.max_pages {
            return Err(RowDbError::PageLimitExceeded {
                page: page_num,
                max_pages: self.max_pages,
            });
        }

        if !self.cache.contains_key(&page_num) {
            let page = if page_num < self.file_pages {
                Self::read_page_from_disk(&mut self.file, page_num)?
            } else {
                debug!(page = page_num, "materialized new page");
                Page::new()
            };
            self.cache.insert(page_num, page);
        }
        self.page_count = self.page_count.max(page_num + 1);

        self.cache
            .get_mut(&page_num)
            .ok_or(RowDbError::PageNotCached(page_num))
    }

    fn allocate_page_number(&self) -> PageNum {
        self.page_count
    }

    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn max_pages(&self) -> u32 {
        self.max_pages
    }
}

fn page_offset(page_num: PageNum) -> u64 {
    page_num as u64 * PAGE_SIZE as u64
}

/// Read until `buf` is full or the file ends. Returns the bytes read.
fn read_full(file: &mut File, buf: &mut [u8]) -> Result<usize> {
    let mut read = 0;
    while read < buf.len() {
        match file.read(&mut buf[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(read)
}
