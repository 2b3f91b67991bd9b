use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::Context;

/// One page of an ordered, filtered result stream.
///
/// The stream is consumed only until the page is full and one further item has been seen, so
/// `total_items` is reported only when the stream ended inside or before this page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub page_index: usize,
    pub page_size: usize,
    pub has_more: bool,
    pub total_pages_known: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<usize>,
    /// Elapsed wall-clock time spent in this call (milliseconds).
    #[serde(default)]
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Position {
    BeforePage,
    InPage,
    AfterPage,
}

#[derive(Debug)]
pub(super) struct PageCollector<T> {
    page_index: usize,
    page_size: usize,
    start: usize,
    end: usize,
    seen: usize,
    items: Vec<T>,
    overflowed: bool,
}

fn initial_capacity(page_size: usize) -> usize {
    const MAX_INITIAL_CAPACITY: usize = 1024;
    page_size.min(MAX_INITIAL_CAPACITY)
}

impl<T> PageCollector<T> {
    pub(super) fn new(ctx: &Context, page_index: usize, page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::InvalidPageParameters(
                "page_size must be > 0".to_string(),
            ));
        }
        let max_page_size = ctx.policy().limits.max_page_size;
        if page_size > max_page_size {
            return Err(Error::InvalidPageParameters(format!(
                "page_size must be <= {max_page_size}"
            )));
        }
        let start = page_index.checked_mul(page_size).ok_or_else(|| {
            Error::InvalidPageParameters(format!(
                "page_index {page_index} is out of range for page_size {page_size}"
            ))
        })?;
        let end = start.checked_add(page_size).ok_or_else(|| {
            Error::InvalidPageParameters(format!(
                "page_index {page_index} is out of range for page_size {page_size}"
            ))
        })?;
        Ok(Self {
            page_index,
            page_size,
            start,
            end,
            seen: 0,
            items: Vec::with_capacity(initial_capacity(page_size)),
            overflowed: false,
        })
    }

    /// Where the next pushed item would land.
    pub(super) fn next_position(&self) -> Position {
        if self.seen < self.start {
            Position::BeforePage
        } else if self.seen < self.end {
            Position::InPage
        } else {
            Position::AfterPage
        }
    }

    /// Counts `item` and keeps it when it falls inside the page.
    ///
    /// `Continue(Some(index))` means the item was stored at `index`; `Break` means the page
    /// was already full and the stream can stop.
    pub(super) fn push(&mut self, item: T) -> ControlFlow<(), Option<usize>> {
        match self.next_position() {
            Position::BeforePage => {
                self.seen += 1;
                ControlFlow::Continue(None)
            }
            Position::InPage => {
                self.seen += 1;
                self.items.push(item);
                ControlFlow::Continue(Some(self.items.len() - 1))
            }
            Position::AfterPage => {
                self.overflowed = true;
                ControlFlow::Break(())
            }
        }
    }

    /// Like [`PageCollector::push`], but only builds the item when it lands in the page.
    pub(super) fn offer(&mut self, build: impl FnOnce() -> T) -> ControlFlow<(), Option<usize>> {
        match self.next_position() {
            Position::InPage => self.push(build()),
            _ => self.skip().map_continue(|()| None),
        }
    }

    /// Records an item without building it when it is known to precede the page.
    pub(super) fn skip(&mut self) -> ControlFlow<()> {
        if self.next_position() == Position::AfterPage {
            self.overflowed = true;
            return ControlFlow::Break(());
        }
        self.seen += 1;
        ControlFlow::Continue(())
    }

    pub(super) fn is_done(&self) -> bool {
        self.overflowed
    }

    pub(super) fn item_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    pub(super) fn finish(self, elapsed_ms: u64) -> PageResult<T> {
        let (total_items, total_pages) = if self.overflowed {
            (None, None)
        } else {
            (Some(self.seen), Some(self.seen.div_ceil(self.page_size)))
        };
        PageResult {
            items: self.items,
            page_index: self.page_index,
            page_size: self.page_size,
            has_more: self.overflowed,
            total_pages_known: !self.overflowed,
            total_items,
            total_pages,
            elapsed_ms,
        }
    }
}
