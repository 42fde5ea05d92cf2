//! Session replacement across the synchronous engine and the async host

use crate::common::*;
use facetstream::{
    BufferedResultStream, FetchRequest, FetchTicket, PageDisposition, ResultPage, SearchClient,
    SearchCriteria, StreamPhase, StreamResult,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Notify;

/// Delays the first request until released
struct SlowFirst {
    inner: FakeCatalog,
    started: Notify,
    release: Notify,
    first: std::sync::atomic::AtomicBool,
}

#[async_trait::async_trait]
impl SearchClient for SlowFirst {
    async fn search(&self, request: &FetchRequest) -> StreamResult<Value> {
        if self.first.swap(false, std::sync::atomic::Ordering::SeqCst) {
            self.started.notify_one();
            self.release.notified().await;
        }
        self.inner.search(request).await
    }
}

#[tokio::test]
async fn test_late_response_never_mixes_sessions() {
    init_tracing();
    let client = Arc::new(SlowFirst {
        inner: FakeCatalog::generated(30),
        started: Notify::new(),
        release: Notify::new(),
        first: std::sync::atomic::AtomicBool::new(true),
    });
    let browser = facetstream::CatalogBrowser::new(Arc::clone(&client), config(5)).unwrap();
    let mut rx = browser.subscribe();

    browser.reset(sarees().select("color", "red"));
    client.started.notified().await;
    browser.reset(sarees().select("color", "blue"));
    wait_until(&mut rx, |s| s.phase == StreamPhase::Streaming).await;

    client.release.notify_one();
    let snap = wait_until(&mut rx, |s| s.stats.stale_discarded == 1).await;
    assert_eq!(snap.visible_items.len(), 5);
    assert!(snap.visible_items.iter().all(|i| i.field("color").unwrap() == "blue"));
}

#[test]
fn test_engine_with_closure_dispatcher() {
    let tickets = std::rc::Rc::new(std::cell::RefCell::new(Vec::<FetchTicket>::new()));
    let sink = std::rc::Rc::clone(&tickets);
    let dispatcher = move |ticket: FetchTicket| -> StreamResult<()> {
        sink.borrow_mut().push(ticket);
        Ok(())
    };
    let mut stream = BufferedResultStream::new(config(2), dispatcher).unwrap();

    stream.reset(SearchCriteria::new("a"));
    let a = tickets.borrow_mut().remove(0);
    stream.reset(SearchCriteria::new("b"));
    let b = tickets.borrow_mut().remove(0);
    assert!(b.session > a.session);

    let page = |prefix: &str| {
        let items = (0..2)
            .map(|i| facetstream::ResultItem::new(format!("{}{}", prefix, i)))
            .collect();
        ResultPage::new(items, 3)
    };
    assert_eq!(stream.on_page_arrived(b.session, page("b"), 0), PageDisposition::Applied);
    assert_eq!(stream.on_page_arrived(a.session, page("a"), 0), PageDisposition::Stale);

    let visible: Vec<&str> = stream.visible_items().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(visible, vec!["b0", "b1"]);
}
