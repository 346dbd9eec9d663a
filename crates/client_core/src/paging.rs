//! Keyed page loading for unbounded lists.
//!
//! [`PagingEngine`] is a plain value kept inside a feature's State. A fold
//! asks it for the next [`PageRequest`], runs [`fetch`] as a child task, and
//! folds the returned [`PageLoadResult`] back in with [`PagingEngine::apply`].
//! Invalidation bumps a generation counter so results of loads started before
//! it are ignored.

use async_trait::async_trait;
use shared::error::ErrorException;

pub type PageKey = u32;

pub const FIRST_PAGE_KEY: PageKey = 1;
pub const DEFAULT_PAGE_SIZE: usize = 20;

#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Clone + Send + Sync + 'static;

    async fn load_page(
        &self,
        key: PageKey,
        page_size: usize,
    ) -> Result<Vec<Self::Item>, ErrorException>;
}

pub fn prev_key(key: PageKey) -> Option<PageKey> {
    (key > FIRST_PAGE_KEY).then(|| key - 1)
}

/// `None` marks the end of the collection: the page came back short or empty.
pub fn next_key(key: PageKey, loaded: usize, page_size: usize) -> Option<PageKey> {
    (loaded > 0 && loaded >= page_size).then(|| key + 1)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub key: PageKey,
    pub items: Vec<T>,
    pub prev_key: Option<PageKey>,
    pub next_key: Option<PageKey>,
}

/// Key to resume from after a refresh, based on the page holding the anchor.
pub fn refresh_key<T>(pages: &[Page<T>], anchor_position: Option<usize>) -> Option<PageKey> {
    let anchor = anchor_position?;
    let page = closest_page_to_position(pages, anchor)?;
    page.prev_key
        .map(|key| key + 1)
        .or_else(|| page.next_key.map(|key| key - 1))
}

fn closest_page_to_position<T>(pages: &[Page<T>], position: usize) -> Option<&Page<T>> {
    let mut start = 0;
    for page in pages {
        if position < start + page.items.len() {
            return Some(page);
        }
        start += page.items.len();
    }
    pages.last()
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Idle,
    Loading(PageKey),
    Loaded(PageKey),
    Error(PageKey, ErrorException),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub key: PageKey,
    pub page_size: usize,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageLoadResult<T> {
    pub request: PageRequest,
    pub outcome: Result<Vec<T>, ErrorException>,
}

pub async fn fetch<S>(source: &S, request: PageRequest) -> PageLoadResult<S::Item>
where
    S: PageSource + ?Sized,
{
    let outcome = source.load_page(request.key, request.page_size).await;
    PageLoadResult { request, outcome }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PagingEngine<T> {
    page_size: usize,
    pages: Vec<Page<T>>,
    anchor_position: Option<usize>,
    invalidated: bool,
    /// Set while a refresh is in flight; its page replaces the loaded ones.
    replacing: bool,
    generation: u64,
    load_state: LoadState,
}

impl<T> Default for PagingEngine<T> {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl<T> PagingEngine<T> {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            pages: Vec::new(),
            anchor_position: None,
            invalidated: false,
            replacing: false,
            generation: 0,
            load_state: LoadState::Idle,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn pages(&self) -> &[Page<T>] {
        &self.pages
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.load_state, LoadState::Loading(_))
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    pub fn error(&self) -> Option<&ErrorException> {
        match &self.load_state {
            LoadState::Error(_, error) => Some(error),
            _ => None,
        }
    }

    pub fn end_reached(&self) -> bool {
        self.pages.last().is_some_and(|page| page.next_key.is_none())
    }

    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.pages.iter().flat_map(|page| page.items.iter())
    }

    pub fn len(&self) -> usize {
        self.pages.iter().map(|page| page.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_anchor(&mut self, position: usize) {
        self.anchor_position = Some(position);
    }

    pub fn anchor_position(&self) -> Option<usize> {
        self.anchor_position
    }

    /// Drops every loaded page; the next load starts at the first key.
    pub fn invalidate(&mut self) {
        self.pages.clear();
        self.anchor_position = None;
        self.invalidated = true;
        self.replacing = false;
        self.generation += 1;
        self.load_state = LoadState::Idle;
    }

    pub fn refresh_key(&self) -> PageKey {
        if self.invalidated || self.pages.is_empty() {
            return FIRST_PAGE_KEY;
        }
        refresh_key(&self.pages, self.anchor_position).unwrap_or(FIRST_PAGE_KEY)
    }

    /// Restarts the sequence at [`Self::refresh_key`]. Loaded pages stay
    /// visible until the refresh succeeds and are kept if it fails.
    pub fn begin_refresh(&mut self) -> PageRequest {
        let key = self.refresh_key();
        self.generation += 1;
        self.replacing = true;
        self.start(key)
    }

    pub fn can_prepend(&self) -> bool {
        !self.is_loading()
            && self.error().is_none()
            && self.pages.first().is_some_and(|page| page.prev_key.is_some())
    }

    /// Next untouched key after the last loaded page. A failed append is
    /// retried at the same key.
    pub fn begin_next(&mut self) -> Option<PageRequest> {
        let key = match &self.load_state {
            LoadState::Loading(_) => return None,
            LoadState::Error(key, _) if self.is_append_key(*key) => *key,
            _ => match self.pages.last() {
                None => self.refresh_key(),
                Some(page) => page.next_key?,
            },
        };
        Some(self.start(key))
    }

    /// Key preceding the first loaded page, when the sequence did not start at 1.
    pub fn begin_prev(&mut self) -> Option<PageRequest> {
        if self.is_loading() {
            return None;
        }
        let key = self.pages.first()?.prev_key?;
        Some(self.start(key))
    }

    /// Folds a load result in. Returns `false` for results of loads started
    /// before the last invalidation or refresh.
    pub fn apply(&mut self, result: PageLoadResult<T>) -> bool {
        let PageLoadResult { request, outcome } = result;
        if request.generation != self.generation {
            return false;
        }

        let replacing = std::mem::take(&mut self.replacing);
        match outcome {
            Ok(items) => {
                if replacing {
                    self.pages.clear();
                    self.anchor_position = None;
                }
                let page = Page {
                    key: request.key,
                    prev_key: prev_key(request.key),
                    next_key: next_key(request.key, items.len(), request.page_size),
                    items,
                };
                match self.pages.iter().position(|loaded| loaded.key >= page.key) {
                    Some(index) if self.pages[index].key == page.key => self.pages[index] = page,
                    Some(index) => {
                        // Rows at or after the insertion point move down.
                        let start: usize = self.pages[..index].iter().map(|p| p.items.len()).sum();
                        if let Some(anchor) = self.anchor_position.as_mut() {
                            if *anchor >= start {
                                *anchor += page.items.len();
                            }
                        }
                        self.pages.insert(index, page);
                    }
                    None => self.pages.push(page),
                }
                self.invalidated = false;
                self.load_state = LoadState::Loaded(request.key);
            }
            Err(error) => {
                self.load_state = LoadState::Error(request.key, error);
            }
        }
        true
    }

    fn is_append_key(&self, key: PageKey) -> bool {
        self.pages.last().map_or(true, |page| page.key < key)
    }

    fn start(&mut self, key: PageKey) -> PageRequest {
        self.load_state = LoadState::Loading(key);
        PageRequest {
            key,
            page_size: self.page_size,
            generation: self.generation,
        }
    }
}

#[cfg(test)]
#[path = "tests/paging_tests.rs"]
mod tests;
