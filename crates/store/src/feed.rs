use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::document::{CollectionPath, Document, Filter};

/// One change-feed event: the full current record set matching the
/// subscriber's filter, in insertion order.
pub type Snapshot = Vec<Document>;

/// Registry of change-feed subscribers shared by the store adapters.
///
/// Subscribers with closed receivers are dropped at the next publish, so a
/// leaked handle cannot grow the registry forever.
#[derive(Debug, Default)]
pub struct ChangeFeed {
    inner: Mutex<FeedState>,
}

#[derive(Debug, Default)]
struct FeedState {
    next_id: u64,
    entries: Vec<FeedEntry>,
}

#[derive(Debug)]
struct FeedEntry {
    id: u64,
    collection: CollectionPath,
    filter: Option<Filter>,
    sender: mpsc::UnboundedSender<Snapshot>,
}

impl ChangeFeed {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a subscriber and delivers `initial` as its first event
    /// before any commit can race in.
    pub fn register(
        self: &Arc<Self>,
        collection: CollectionPath,
        filter: Option<Filter>,
        initial: &[Document],
    ) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut state = self.lock_state();
        let id = state.next_id;
        state.next_id += 1;

        let entry = FeedEntry { id, collection, filter, sender };
        let _ = entry.sender.send(entry.apply_filter(initial));
        state.entries.push(entry);

        Subscription { id, feed: Arc::clone(self), receiver }
    }

    /// Fans the committed record set out to every subscriber of the
    /// collection, applying each subscriber's filter.
    pub fn publish(&self, collection: &CollectionPath, documents: &[Document]) {
        let mut state = self.lock_state();
        state.entries.retain(|entry| {
            if &entry.collection != collection {
                return true;
            }
            entry.sender.send(entry.apply_filter(documents)).is_ok()
        });
    }

    pub fn subscriber_count(&self, collection: &CollectionPath) -> usize {
        self.lock_state().entries.iter().filter(|entry| &entry.collection == collection).count()
    }

    fn unregister(&self, id: u64) {
        self.lock_state().entries.retain(|entry| entry.id != id);
    }

    fn lock_state(&self) -> MutexGuard<'_, FeedState> {
        match self.inner.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl FeedEntry {
    fn apply_filter(&self, documents: &[Document]) -> Snapshot {
        match &self.filter {
            Some(filter) => {
                documents.iter().filter(|doc| filter.matches(&doc.body)).cloned().collect()
            }
            None => documents.to_vec(),
        }
    }
}

/// A live change-feed handle. Scoped: the registry entry is released by
/// `close()` or by dropping the handle, whichever comes first.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    feed: Arc<ChangeFeed>,
    receiver: mpsc::UnboundedReceiver<Snapshot>,
}

impl Subscription {
    /// Waits for the next snapshot. Returns `None` once the feed side is
    /// gone (the store was dropped).
    pub async fn recv(&mut self) -> Option<Snapshot> {
        self.receiver.recv().await
    }

    pub fn close(self) {
        // Unregistration happens in Drop.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.feed.unregister(self.id);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::document::{CollectionPath, Document, DocumentId, Filter};

    use super::ChangeFeed;

    fn collection() -> CollectionPath {
        CollectionPath::new("app", "public", "tenders")
    }

    fn doc(id: &str, status: &str) -> Document {
        Document { id: DocumentId(id.to_string()), body: json!({"id": id, "status": status}) }
    }

    #[tokio::test]
    async fn subscriber_receives_initial_then_published_snapshots() {
        let feed = ChangeFeed::new();
        let mut sub = feed.register(collection(), None, &[doc("a", "open")]);

        let initial = sub.recv().await.expect("initial snapshot");
        assert_eq!(initial.len(), 1);

        feed.publish(&collection(), &[doc("a", "open"), doc("b", "open")]);
        let next = sub.recv().await.expect("published snapshot");
        assert_eq!(next.len(), 2);
    }

    #[tokio::test]
    async fn filters_are_applied_per_subscriber() {
        let feed = ChangeFeed::new();
        let filter = Filter::field_equals("status", "open");
        let mut sub = feed.register(collection(), Some(filter), &[]);
        let _ = sub.recv().await;

        feed.publish(&collection(), &[doc("a", "open"), doc("b", "awarded")]);
        let snapshot = sub.recv().await.expect("filtered snapshot");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id.0, "a");
    }

    #[tokio::test]
    async fn other_collections_do_not_cross_feed() {
        let feed = ChangeFeed::new();
        let other = CollectionPath::new("app", "public", "bids");
        let mut sub = feed.register(collection(), None, &[]);
        let _ = sub.recv().await;

        feed.publish(&other, &[doc("a", "pending")]);
        feed.publish(&collection(), &[doc("t", "open")]);

        let snapshot = sub.recv().await.expect("snapshot for own collection");
        assert_eq!(snapshot[0].id.0, "t");
    }

    #[tokio::test]
    async fn dropping_the_handle_unregisters_it() {
        let feed = ChangeFeed::new();
        {
            let _sub = feed.register(collection(), None, &[]);
            assert_eq!(feed.subscriber_count(&collection()), 1);
        }
        assert_eq!(feed.subscriber_count(&collection()), 0);
    }

    #[tokio::test]
    async fn close_releases_the_registration() {
        let feed = ChangeFeed::new();
        let sub = feed.register(collection(), None, &[]);
        sub.close();
        assert_eq!(feed.subscriber_count(&collection()), 0);
    }
}
