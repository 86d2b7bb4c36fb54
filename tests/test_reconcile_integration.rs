//! End-to-end reconciliation against HTTP fakes
//!
//! A mockito server stands in for the subgraph and another for the push
//! endpoint; the state file lives in a temp dir. Verifies:
//! - New swaps reach the push endpoint with the exact alert text
//! - The checkpoint lands on disk and survives a reopen
//! - A restart with no new data sends nothing and rewrites nothing

#[cfg(test)]
mod reconcile_integration_tests {
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use swap_notifier::pipeline::{
        BarkNotifier, FetchBackoff, GraphSwapSource, PassOutcome, Reconciler, StateStore,
    };
    use tempfile::tempdir;

    fn swap_json(block: u64, tx: &str, amount0: &str, amount1: &str) -> serde_json::Value {
        json!({
            "id": format!("{}-0", tx),
            "sender": "0x1111111111111111111111111111111111111111",
            "recipient": "0x2222222222222222222222222222222222222222",
            "amount0": amount0,
            "amount1": amount1,
            "sqrtPriceX96": "79228162514264337593543950336",
            "liquidity": "1000000",
            "tick": 12,
            "blockNumber": block.to_string(),
            "blockTimestamp": "1700000000",
            "transactionHash": tx,
            "btcPrice": "100000"
        })
    }

    fn reconciler(store: Arc<StateStore>, graph_url: String) -> Reconciler {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        Reconciler::new(
            store.clone(),
            Arc::new(GraphSwapSource::new(client.clone(), graph_url)),
            Arc::new(BarkNotifier::new(client, store)),
            FetchBackoff::fixed(Duration::from_millis(10)),
        )
    }

    #[tokio::test]
    async fn test_pass_delivers_and_checkpoints() {
        let mut graph = Server::new_async().await;
        let mut push = Server::new_async().await;

        let swaps = graph
            .mock("POST", "/")
            .match_body(Matcher::Regex(r"blockNumber_gt: 21700000\b".to_string()))
            .with_status(200)
            .with_body(
                json!({"data": {"swaps": [
                    swap_json(21700010, "0xnew", "-100000000", "200000000"),
                    swap_json(21700005, "0xold", "50000000", "-49000000"),
                ]}})
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let target = format!("{}/key/title/", push.url());
        // Path prefix is identical whether or not the server decodes it
        let alert_path = Matcher::Regex(
            r"^/key/title/2023-11-15.+2\.00000.+WBTC.+1\.00000.+UNIBTC.+200000\.00".to_string(),
        );

        let new_swap = push
            .mock("GET", alert_path)
            .match_query(Matcher::UrlEncoded("call".into(), "1".into()))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let path = dir.path().join("app_config.json");
        std::fs::write(
            &path,
            json!({
                "notificationTargets": [target],
                "lastBlockNumber": "21700000",
                "recentTxHashes": ["0xold"]
            })
            .to_string(),
        )
        .unwrap();

        let store = Arc::new(StateStore::open(&path));
        let mut reconciler = reconciler(store.clone(), graph.url());

        let outcome = reconciler.run_pass().await.unwrap();
        let PassOutcome::Checkpointed(report) = outcome else {
            panic!("expected a checkpoint");
        };

        swaps.assert_async().await;
        new_swap.assert_async().await;
        assert_eq!(report.notified, 1);
        assert_eq!(report.already_seen, 1);

        let reopened = StateStore::open(&path);
        assert_eq!(reopened.last_block_number(), "21700010");
        assert_eq!(reopened.recent_tx_hashes(), vec!["0xnew"]);
    }

    #[tokio::test]
    async fn test_restart_without_new_data_is_quiet() {
        let mut graph = Server::new_async().await;
        let mut push = Server::new_async().await;

        graph
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"data": {"swaps": []}}"#)
            .expect(2)
            .create_async()
            .await;
        let never = push
            .mock("GET", Matcher::Any)
            .with_status(200)
            .expect(0)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let path = dir.path().join("app_config.json");
        let original = json!({
            "notificationTargets": [format!("{}/key/", push.url())],
            "lastBlockNumber": "21700010",
            "recentTxHashes": ["0xnew"]
        })
        .to_string();
        std::fs::write(&path, &original).unwrap();

        for _ in 0..2 {
            let store = Arc::new(StateStore::open(&path));
            let mut reconciler = reconciler(store, graph.url());
            assert_eq!(reconciler.run_pass().await.unwrap(), PassOutcome::NoNewSwaps);
        }

        never.assert_async().await;
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[tokio::test]
    async fn test_subgraph_outage_keeps_checkpoint() {
        let mut graph = Server::new_async().await;
        graph
            .mock("POST", "/")
            .with_status(503)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let path = dir.path().join("app_config.json");
        let store = Arc::new(StateStore::open(&path));
        let before = std::fs::read_to_string(&path).unwrap();

        let mut reconciler = reconciler(store.clone(), graph.url());
        assert!(reconciler.run_pass().await.is_err());

        assert_eq!(store.last_block_number(), "21612681");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }
}
