//! Push delivery to Bark-style endpoints
//!
//! Each target is a base URL; the message is appended as a percent-encoded
//! path segment followed by `?call=1`, and delivered with a plain GET.

use super::state_store::StateStore;
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Client;
use std::sync::Arc;
use thiserror::Error;

/// Everything except unreserved characters is escaped
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("no notification targets configured")]
    NoTargets,

    #[error("all {0} notification targets failed")]
    AllTargetsFailed(usize),
}

/// Delivery of a formatted message
///
/// `Ok(n)` carries the number of targets that accepted the message; it is
/// only returned when at least one did.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, message: &str) -> Result<usize, NotifyError>;
}

/// `target + urlencode(message) + "?call=1"`
pub fn push_url(target: &str, message: &str) -> String {
    format!(
        "{}{}?call=1",
        target,
        utf8_percent_encode(message, PATH_SEGMENT)
    )
}

/// GETs every target listed in the state store
///
/// Targets are read per message, so a hot-reloaded list applies from the next
/// swap on.
pub struct BarkNotifier {
    client: Client,
    store: Arc<StateStore>,
}

impl BarkNotifier {
    pub fn new(client: Client, store: Arc<StateStore>) -> Self {
        Self { client, store }
    }

    async fn deliver(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => {
                log::info!("📨 Notification sent successfully: {}", url);
                true
            }
            Ok(response) => {
                log::error!("Notification failed: {} (status {})", url, response.status());
                false
            }
            Err(e) => {
                log::error!("Failed to send notification to device {}: {}", url, e);
                false
            }
        }
    }
}

#[async_trait]
impl NotificationSink for BarkNotifier {
    async fn notify(&self, message: &str) -> Result<usize, NotifyError> {
        let targets = self.store.notification_targets();
        if targets.is_empty() {
            return Err(NotifyError::NoTargets);
        }

        let mut delivered = 0;
        for target in &targets {
            if self.deliver(&push_url(target, message)).await {
                delivered += 1;
            }
        }

        if delivered == 0 {
            return Err(NotifyError::AllTargetsFailed(targets.len()));
        }
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use tempfile::tempdir;

    fn store_with_targets(dir: &tempfile::TempDir, targets: Vec<String>) -> Arc<StateStore> {
        let store = Arc::new(StateStore::open(dir.path().join("app_config.json")));
        store.set_notification_targets(targets);
        store
    }

    #[test]
    fn test_push_url_encodes_message() {
        let url = push_url(
            "https://api.day.app/key/title/",
            "2023-11-15 06:13:20  2.00000 WBTC -> 1.00000 UNIBTC Vol: $200000.00",
        );
        assert_eq!(
            url,
            "https://api.day.app/key/title/2023-11-15%2006%3A13%3A20%20%202.00000%20WBTC%20-%3E%201.00000%20UNIBTC%20Vol%3A%20%24200000.00?call=1"
        );
    }

    #[tokio::test]
    async fn test_every_target_is_attempted() {
        let mut ok_server = Server::new_async().await;
        let mut bad_server = Server::new_async().await;

        let ok = ok_server
            .mock("GET", Matcher::Regex(r"^/push/".to_string()))
            .match_query(Matcher::UrlEncoded("call".into(), "1".into()))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;
        let bad = bad_server
            .mock("GET", Matcher::Any)
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        // Failing target first: it must not stop the second one
        let store = store_with_targets(
            &dir,
            vec![
                format!("{}/push/", bad_server.url()),
                format!("{}/push/", ok_server.url()),
            ],
        );

        let notifier = BarkNotifier::new(Client::new(), store);
        let delivered = notifier.notify("hello world").await.unwrap();

        assert_eq!(delivered, 1);
        ok.assert_async().await;
        bad.assert_async().await;
    }

    #[tokio::test]
    async fn test_all_targets_failing_is_an_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let store = store_with_targets(
            &dir,
            vec![
                format!("{}/push/", server.url()),
                // Nothing listens here
                "http://127.0.0.1:1/push/".to_string(),
            ],
        );

        let notifier = BarkNotifier::new(Client::new(), store);
        assert!(matches!(
            notifier.notify("msg").await,
            Err(NotifyError::AllTargetsFailed(2))
        ));
    }

    #[tokio::test]
    async fn test_no_targets() {
        let dir = tempdir().unwrap();
        let store = store_with_targets(&dir, vec![]);
        let notifier = BarkNotifier::new(Client::new(), store);
        assert!(matches!(notifier.notify("msg").await, Err(NotifyError::NoTargets)));
    }
}
