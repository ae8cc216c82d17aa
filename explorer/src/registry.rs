use rand::Rng;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::address::AccountAddress;
use crate::controller::{resolve_sender, FeedSettings, TransactionFeedController};
use crate::metrics;
use crate::source::{IndexQueryService, NodeRestService};

/// Feed ID size in bytes (hex-encoded on the wire)
pub const FEED_ID_BYTES: usize = 16;

#[derive(Default)]
struct Feeds {
    by_id: HashMap<String, Arc<TransactionFeedController>>,
    /// Creation order, oldest first, for eviction
    order: VecDeque<String>,
}

/// Open feeds, one controller per rendered view.
///
/// Every controller shares the same backend clients; only the pagination
/// state is per feed.
#[derive(Clone)]
pub struct FeedRegistry {
    indexer: Arc<dyn IndexQueryService>,
    node: Arc<dyn NodeRestService>,
    settings: FeedSettings,
    max_open: usize,
    feeds: Arc<RwLock<Feeds>>,
}

fn new_feed_id() -> String {
    let mut bytes = [0u8; FEED_ID_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

impl FeedRegistry {
    pub fn new(
        indexer: Arc<dyn IndexQueryService>,
        node: Arc<dyn NodeRestService>,
        settings: FeedSettings,
        max_open: usize,
    ) -> Self {
        Self {
            indexer,
            node,
            settings,
            max_open: max_open.max(1),
            feeds: Arc::new(RwLock::new(Feeds::default())),
        }
    }

    /// Open a feed for `address`. The feed starts idle; nothing is fetched yet.
    pub async fn create(&self, address: &AccountAddress) -> (String, Arc<TransactionFeedController>) {
        let controller = Arc::new(TransactionFeedController::new(
            self.indexer.clone(),
            self.node.clone(),
            self.settings,
        ));
        controller.reset(address).await;

        let feed_id = new_feed_id();
        let mut feeds = self.feeds.write().await;

        while feeds.by_id.len() >= self.max_open {
            let Some(oldest) = feeds.order.pop_front() else {
                break;
            };
            if feeds.by_id.remove(&oldest).is_some() {
                debug!(feed_id = %oldest, "Evicted oldest feed");
            }
        }

        feeds.by_id.insert(feed_id.clone(), controller.clone());
        feeds.order.push_back(feed_id.clone());
        metrics::set_open_feeds(feeds.by_id.len());

        info!(%feed_id, address = %address, "Feed opened");
        (feed_id, controller)
    }

    /// Sender lookup that does not need an open feed
    pub async fn resolve_sender_by_version(&self, version: u64) -> Option<String> {
        resolve_sender(self.node.as_ref(), version).await
    }

    pub async fn get(&self, feed_id: &str) -> Option<Arc<TransactionFeedController>> {
        self.feeds.read().await.by_id.get(feed_id).cloned()
    }

    /// Close a feed. Returns false if it was not open.
    pub async fn remove(&self, feed_id: &str) -> bool {
        let mut feeds = self.feeds.write().await;
        let removed = feeds.by_id.remove(feed_id).is_some();
        if removed {
            feeds.order.retain(|id| id != feed_id);
            metrics::set_open_feeds(feeds.by_id.len());
            info!(%feed_id, "Feed closed");
        } else {
            debug!(%feed_id, "No feed to close");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.feeds.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every open feed (for graceful shutdown)
    pub async fn clear(&self) {
        let mut feeds = self.feeds.write().await;
        let count = feeds.by_id.len();
        feeds.by_id.clear();
        feeds.order.clear();
        metrics::set_open_feeds(0);
        info!(count, "All feeds closed");
    }
}
