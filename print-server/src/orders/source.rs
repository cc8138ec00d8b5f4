//! Where the dispatcher gets its orders from
//!
//! The instance that owns the redb store reads it directly. Any other
//! instance polls the owner's HTTP feed (`FEED_URL`) and forwards its own
//! intake there, so every order lands in the one store that gets printed.

use async_trait::async_trait;
use serde::Deserialize;
use shared::models::{MarkPrintedRequest, Order, OrderIntake};
use std::time::Duration;
use thiserror::Error;

use super::store::{MarkOutcome, OrderStore, StorageError};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Store error: {0}")]
    Store(#[from] StorageError),

    #[error("Feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed at {url} answered HTTP {status}")]
    Rejected { url: String, status: u16 },
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Unprinted order feed with printed acknowledgement
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// Unprinted orders, oldest first
    async fn list_unprinted(&self) -> SourceResult<Vec<Order>>;

    /// Acknowledge a printed order; unknown ids are not an error
    async fn mark_printed(&self, order_id: &str) -> SourceResult<()>;
}

#[async_trait]
impl OrderSource for OrderStore {
    async fn list_unprinted(&self) -> SourceResult<Vec<Order>> {
        Ok(OrderStore::list_unprinted(self)?)
    }

    async fn mark_printed(&self, order_id: &str) -> SourceResult<()> {
        match OrderStore::mark_printed(self, order_id)? {
            MarkOutcome::Marked | MarkOutcome::AlreadyPrinted => {}
            MarkOutcome::NotFound => {
                tracing::warn!(order_id = %order_id, "Printed order no longer in store");
            }
        }
        Ok(())
    }
}

/// Remote order feed served by another print-server's HTTP API
#[derive(Debug, Clone)]
pub struct HttpOrderFeed {
    client: reqwest::Client,
    orders_url: String,
    mark_url: String,
}

impl HttpOrderFeed {
    /// `base_url` may be the server root or the `/orders` endpoint itself
    pub fn new(base_url: &str, timeout: Duration) -> SourceResult<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let orders_url = if trimmed.ends_with("/orders") {
            trimmed.to_string()
        } else {
            format!("{}/orders", trimmed)
        };
        let mark_url = format!("{}/mark-printed", orders_url);

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            orders_url,
            mark_url,
        })
    }

    pub fn orders_url(&self) -> &str {
        &self.orders_url
    }

    pub fn mark_url(&self) -> &str {
        &self.mark_url
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Created {
    order_id: String,
}

impl HttpOrderFeed {
    /// Store a paid order at the feed owner and return the id it assigned
    ///
    /// Callers validate first; a rejection here means the owner disagrees or is down.
    pub async fn submit(&self, intake: &OrderIntake) -> SourceResult<String> {
        let resp = self.client.post(&self.orders_url).json(intake).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(self.rejected(&self.orders_url, status));
        }
        Ok(resp.json::<Created>().await?.order_id)
    }

    /// Mark an order printed at the feed owner
    pub async fn acknowledge(&self, order_id: &str) -> SourceResult<MarkOutcome> {
        let resp = self
            .client
            .post(&self.mark_url)
            .json(&MarkPrintedRequest {
                order_id: order_id.to_string(),
            })
            .send()
            .await?;

        match resp.status() {
            status if status.is_success() => Ok(MarkOutcome::Marked),
            reqwest::StatusCode::NOT_FOUND => Ok(MarkOutcome::NotFound),
            status => Err(self.rejected(&self.mark_url, status)),
        }
    }

    fn rejected(&self, url: &str, status: reqwest::StatusCode) -> SourceError {
        SourceError::Rejected {
            url: url.to_string(),
            status: status.as_u16(),
        }
    }
}

#[async_trait]
impl OrderSource for HttpOrderFeed {
    async fn list_unprinted(&self) -> SourceResult<Vec<Order>> {
        let resp = self.client.get(&self.orders_url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(self.rejected(&self.orders_url, status));
        }
        Ok(resp.json::<Vec<Order>>().await?)
    }

    async fn mark_printed(&self, order_id: &str) -> SourceResult<()> {
        if self.acknowledge(order_id).await? == MarkOutcome::NotFound {
            tracing::warn!(order_id = %order_id, "Printed order unknown to feed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feed_urls() {
        let timeout = Duration::from_secs(5);

        let feed = HttpOrderFeed::new("http://10.0.0.2:3000", timeout).unwrap();
        assert_eq!(feed.orders_url(), "http://10.0.0.2:3000/orders");
        assert_eq!(feed.mark_url(), "http://10.0.0.2:3000/orders/mark-printed");

        let feed = HttpOrderFeed::new("http://10.0.0.2:3000/orders/", timeout).unwrap();
        assert_eq!(feed.orders_url(), "http://10.0.0.2:3000/orders");
    }

    #[tokio::test]
    async fn test_store_source_tolerates_unknown_ids() {
        let store = OrderStore::open_in_memory(chrono::Duration::minutes(120)).unwrap();
        let intake = serde_json::from_value(json!({
            "table": "2",
            "items": [{"name": "Cola", "price": "€2,75", "quantity": 1}],
            "total": 2.75
        }))
        .unwrap();
        let id = store.append(intake).unwrap();

        let source: &dyn OrderSource = &store;
        assert_eq!(source.list_unprinted().await.unwrap().len(), 1);
        source.mark_printed(&id).await.unwrap();
        source.mark_printed(&id).await.unwrap();
        source.mark_printed("missing").await.unwrap();
        assert!(source.list_unprinted().await.unwrap().is_empty());
    }
}
