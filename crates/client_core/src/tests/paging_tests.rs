use super::*;
use shared::error::{SimpleError, UiMessage};

fn loaded(request: PageRequest, items: Vec<u32>) -> PageLoadResult<u32> {
    PageLoadResult {
        request,
        outcome: Ok(items),
    }
}

fn failed(request: PageRequest) -> PageLoadResult<u32> {
    PageLoadResult {
        request,
        outcome: Err(ErrorException::Simple(SimpleError::new(
            "HTTP_500",
            UiMessage::ReportsLoadFailed,
        ))),
    }
}

fn full_page(key: PageKey, size: usize) -> Vec<u32> {
    let start = (key - 1) * size as u32;
    (start..start + size as u32).collect()
}

struct NumberSource {
    total: u32,
}

#[async_trait]
impl PageSource for NumberSource {
    type Item = u32;

    async fn load_page(&self, key: PageKey, page_size: usize) -> Result<Vec<u32>, ErrorException> {
        let start = (key - 1) * page_size as u32;
        Ok((start..(start + page_size as u32).min(self.total)).collect())
    }
}

#[test]
fn key_arithmetic() {
    assert_eq!(prev_key(FIRST_PAGE_KEY), None);
    assert_eq!(prev_key(4), Some(3));
    assert_eq!(next_key(2, 20, 20), Some(3));
    assert_eq!(next_key(2, 7, 20), None);
    assert_eq!(next_key(2, 0, 20), None);
}

#[test]
fn first_load_starts_at_page_one() {
    let mut engine = PagingEngine::<u32>::new(3);
    let request = engine.begin_next().expect("first request");
    assert_eq!(request.key, FIRST_PAGE_KEY);
    assert_eq!(request.page_size, 3);
    assert!(engine.is_loading());
    assert_eq!(engine.begin_next(), None);
}

#[test]
fn short_page_ends_the_sequence() {
    let mut engine = PagingEngine::new(3);
    let first = engine.begin_next().expect("page 1");
    assert!(engine.apply(loaded(first, full_page(1, 3))));
    let second = engine.begin_next().expect("page 2");
    assert_eq!(second.key, 2);
    assert!(engine.apply(loaded(second, vec![3, 4])));

    assert!(engine.end_reached());
    assert_eq!(engine.pages()[1].next_key, None);
    assert_eq!(engine.begin_next(), None);
    assert_eq!(engine.items().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn empty_first_page_is_the_end() {
    let mut engine = PagingEngine::new(5);
    let request = engine.begin_refresh();
    engine.apply(loaded(request, Vec::new()));
    assert!(engine.end_reached());
    assert!(engine.is_empty());
}

#[test]
fn error_keeps_loaded_pages_and_retries_the_same_key() {
    let mut engine = PagingEngine::new(2);
    let first = engine.begin_next().expect("page 1");
    engine.apply(loaded(first, vec![0, 1]));
    let second = engine.begin_next().expect("page 2");
    engine.apply(failed(second));

    assert_eq!(engine.len(), 2);
    assert!(engine.error().is_some());
    assert_eq!(engine.load_state(), &LoadState::Error(2, engine.error().cloned().expect("error")));

    let retry = engine.begin_next().expect("retry");
    assert_eq!(retry.key, 2);
    engine.apply(loaded(retry, vec![2, 3]));
    assert_eq!(engine.load_state(), &LoadState::Loaded(2));
    assert_eq!(engine.len(), 4);
}

#[test]
fn invalidate_restarts_at_page_one_and_drops_stale_results() {
    let mut engine = PagingEngine::new(2);
    let first = engine.begin_next().expect("page 1");
    engine.apply(loaded(first, vec![0, 1]));
    let in_flight = engine.begin_next().expect("page 2");

    engine.invalidate();
    assert!(engine.is_invalidated());
    assert!(engine.is_empty());
    assert_eq!(engine.refresh_key(), FIRST_PAGE_KEY);

    assert!(!engine.apply(loaded(in_flight, vec![2, 3])));
    assert!(engine.is_empty());

    let restart = engine.begin_next().expect("restart");
    assert_eq!(restart.key, FIRST_PAGE_KEY);
    assert!(engine.apply(loaded(restart, vec![10, 11])));
    assert!(!engine.is_invalidated());
}

#[test]
fn refresh_resumes_from_the_anchor_page() {
    let mut engine = PagingEngine::new(2);
    for key in 1..=3 {
        let request = engine.begin_next().expect("request");
        assert_eq!(request.key, key);
        engine.apply(loaded(request, full_page(key, 2)));
    }

    engine.set_anchor(4);
    assert_eq!(engine.refresh_key(), 3);
    engine.set_anchor(0);
    assert_eq!(engine.refresh_key(), 1);
    engine.set_anchor(99);
    assert_eq!(engine.refresh_key(), 3);

    engine.set_anchor(2);
    let refresh = engine.begin_refresh();
    assert_eq!(refresh.key, 2);
    assert_eq!(engine.len(), 6);
    engine.apply(loaded(refresh, full_page(2, 2)));
    assert_eq!(engine.items().copied().collect::<Vec<_>>(), vec![2, 3]);
    assert!(engine.can_prepend());

    engine.set_anchor(1);
    let previous = engine.begin_prev().expect("page before the anchor");
    assert_eq!(previous.key, 1);
    engine.apply(loaded(previous, full_page(1, 2)));
    assert_eq!(engine.pages()[0].key, 1);
    assert_eq!(engine.items().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    assert_eq!(engine.anchor_position(), Some(3));
    assert!(!engine.can_prepend());
    assert_eq!(engine.begin_prev(), None);
}

#[test]
fn failed_refresh_keeps_loaded_pages() {
    let mut engine = PagingEngine::new(2);
    let first = engine.begin_next().expect("page 1");
    engine.apply(loaded(first, vec![0, 1]));

    let refresh = engine.begin_refresh();
    assert_eq!(engine.len(), 2);
    assert!(engine.apply(failed(refresh)));

    assert_eq!(engine.items().copied().collect::<Vec<_>>(), vec![0, 1]);
    assert!(engine.error().is_some());

    let retry = engine.begin_refresh();
    assert_eq!(retry.key, FIRST_PAGE_KEY);
    assert!(engine.apply(loaded(retry, vec![5, 6])));
    assert_eq!(engine.items().copied().collect::<Vec<_>>(), vec![5, 6]);
}

#[test]
fn no_prepend_while_failed() {
    let mut engine = PagingEngine::new(2);
    for key in 1..=2 {
        let request = engine.begin_next().expect("request");
        engine.apply(loaded(request, full_page(key, 2)));
    }
    engine.set_anchor(2);
    let refresh = engine.begin_refresh();
    engine.apply(loaded(refresh, full_page(2, 2)));
    assert!(engine.can_prepend());

    let previous = engine.begin_prev().expect("page 1");
    assert!(!engine.can_prepend());
    engine.apply(failed(previous));
    assert!(!engine.can_prepend());
    assert_eq!(engine.len(), 2);
}

#[test]
fn refresh_key_without_anchor_is_none() {
    let pages = vec![Page {
        key: 2,
        items: vec![1u32],
        prev_key: Some(1),
        next_key: Some(3),
    }];
    assert_eq!(refresh_key(&pages, None), None);
    assert_eq!(refresh_key(&pages, Some(0)), Some(2));
    assert_eq!(refresh_key::<u32>(&[], Some(0)), None);
}

#[test]
fn stale_refresh_result_is_ignored() {
    let mut engine = PagingEngine::new(2);
    let old = engine.begin_refresh();
    let current = engine.begin_refresh();
    assert!(!engine.apply(loaded(old, vec![7, 7])));
    assert!(engine.apply(loaded(current, vec![0, 1])));
    assert_eq!(engine.len(), 2);
}

#[tokio::test]
async fn fetch_walks_a_source_to_the_end() {
    let source = NumberSource { total: 7 };
    let mut engine = PagingEngine::new(3);
    while let Some(request) = engine.begin_next() {
        let result = fetch(&source, request).await;
        assert!(engine.apply(result));
    }
    assert!(engine.end_reached());
    assert_eq!(engine.pages().len(), 3);
    assert_eq!(engine.items().copied().collect::<Vec<_>>(), (0..7).collect::<Vec<_>>());
}
