//! Lazy paginated loading of inference records.

use std::collections::VecDeque;

use tracing::debug;

use crate::error::Result;
use crate::gateway::{Gateway, InferenceRecord, LoadInferencesRequest, PageCursor};

enum Cursor { Start, Next(PageCursor), Done }

/// Single-pass iterator over every record of a paginated fetch. The next page is requested only
/// once all buffered records have been handed out. A failed fetch is yielded once, after which the
/// iterator is exhausted.
pub struct BatchedLoader<'g> {
    gateway: &'g dyn Gateway,
    request: LoadInferencesRequest,
    cursor: Cursor,
    buffer: VecDeque<InferenceRecord>,
    pages: usize,
}

impl<'g> BatchedLoader<'g> {
    pub fn new(gateway: &'g dyn Gateway, request: LoadInferencesRequest) -> Self {
        Self { gateway, request, cursor: Cursor::Start, buffer: VecDeque::new(), pages: 0 }
    }

    /// Number of pages fetched so far.
    pub fn pages_fetched(&self) -> usize { self.pages }

    fn fetch_next(&mut self) -> Result<()> {
        let cursor = match &self.cursor { Cursor::Start => None, Cursor::Next(c) => Some(c), Cursor::Done => return Ok(()) };
        let page = match self.gateway.fetch_inference_page(&self.request, cursor) {
            Ok(p) => p,
            Err(e) => { self.cursor = Cursor::Done; return Err(e.into()); }
        };
        self.pages += 1;
        debug!(page = self.pages, records = page.records.len(), last = page.next_cursor.is_none(), "fetched inference page");
        self.cursor = match page.next_cursor { Some(c) => Cursor::Next(c), None => Cursor::Done };
        self.buffer.extend(page.records);
        Ok(())
    }
}

impl Iterator for BatchedLoader<'_> {
    type Item = Result<InferenceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffer.pop_front() { return Some(Ok(record)); }
            if matches!(self.cursor, Cursor::Done) { return None; }
            // empty non-final pages are skipped
            if let Err(e) = self.fetch_next() { return Some(Err(e)); }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::gateway::{CreateRequest, EntityData, GatewayError, InferencePage, LoadByNameRequest};
    use serde_json::json;
    use std::cell::RefCell;

    struct Pages { pages: RefCell<VecDeque<std::result::Result<InferencePage, GatewayError>>>, cursors: RefCell<Vec<Option<PageCursor>>> }

    impl Gateway for Pages {
        fn create_model(&self, _: &CreateRequest) -> std::result::Result<EntityData, GatewayError> { unreachable!() }
        fn load_model_by_name(&self, _: &LoadByNameRequest) -> std::result::Result<EntityData, GatewayError> { unreachable!() }
        fn fetch_inference_page(&self, _: &LoadInferencesRequest, cursor: Option<&PageCursor>) -> std::result::Result<InferencePage, GatewayError> {
            self.cursors.borrow_mut().push(cursor.cloned());
            self.pages.borrow_mut().pop_front().expect("fetched past the final page")
        }
        fn model_url(&self, id: i64) -> String { format!("test://{id}") }
    }

    fn record(n: u32) -> InferenceRecord { InferenceRecord { test_sample: json!(n), ground_truth: json!(n), inference: json!(n) } }
    fn page(ns: &[u32], next: Option<&str>) -> std::result::Result<InferencePage, GatewayError> {
        Ok(InferencePage { records: ns.iter().map(|n| record(*n)).collect(), next_cursor: next.map(|c| PageCursor(c.into())) })
    }
    fn request() -> LoadInferencesRequest { LoadInferencesRequest { model_id: 1, test_case_id: 2, batch_size: 2 } }

    #[test]
    fn follows_cursors_and_skips_empty_pages() {
        let gw = Pages { pages: RefCell::new(VecDeque::from(vec![page(&[1], Some("c1")), page(&[], Some("c2")), page(&[2], None)])), cursors: RefCell::new(vec![]) };
        let mut loader = BatchedLoader::new(&gw, request());
        let got: Vec<_> = loader.by_ref().map(|r| r.unwrap().inference).collect();
        assert_eq!(got, vec![json!(1), json!(2)]);
        assert_eq!(loader.pages_fetched(), 3);
        assert_eq!(*gw.cursors.borrow(), vec![None, Some(PageCursor("c1".into())), Some(PageCursor("c2".into()))]);
    }

    #[test]
    fn error_ends_the_sequence() {
        let gw = Pages { pages: RefCell::new(VecDeque::from(vec![page(&[1], Some("c1")), Err(GatewayError::Transport("reset".into()))])), cursors: RefCell::new(vec![]) };
        let mut loader = BatchedLoader::new(&gw, request());
        assert!(loader.next().unwrap().is_ok());
        assert!(matches!(loader.next(), Some(Err(ModelError::Gateway(GatewayError::Transport(_))))));
        assert!(loader.next().is_none());
    }
}
