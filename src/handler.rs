use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::warn;

use crate::ipc::{IpcEndpoint, SinkError};
use crate::publication::Publication;
use crate::report::Reporter;

/// Per-subscription unit: decodes an inbound broker message and forwards it
/// to the subscription's own sink.
///
/// Every failure mode here is local to the message: malformed payloads are
/// dropped, an unreachable sink is reported and skipped. Nothing propagates
/// back into the broker's event loop.
pub struct MessageHandler {
    sink: IpcEndpoint,
    wrap: bool,
    reporter: Reporter,
}

impl MessageHandler {
    pub fn new(sink: IpcEndpoint, wrap: bool, reporter: Reporter) -> Self {
        Self {
            sink,
            wrap,
            reporter,
        }
    }

    pub async fn handle(&self, topic: &str, payload: &[u8]) {
        let doc: Map<String, Value> = match serde_json::from_slice(payload) {
            Ok(doc) => doc,
            Err(e) => {
                self.reporter.diag(&format!("bad payload on {topic}: {e}"));
                return;
            }
        };

        let publication = Publication::new(topic, doc);
        let line = if self.wrap {
            publication.wrapped_line()
        } else {
            publication.payload_line()
        };

        match self.sink.send_line(&line).await {
            Ok(()) => {}
            Err(SinkError::Refused { addr }) => {
                self.reporter
                    .diag(&format!("connection refused for {}", addr.display()));
            }
            Err(SinkError::Io(e)) => {
                self.reporter.diag(&format!("sink failed: {e}"));
            }
        }

        self.reporter.echo(&line);
        self.reporter.diag(&format!("received: {line}"));
    }
}

/// Immutable topic-to-handler map, built once at startup. Inbound messages
/// are routed by exact topic; anything unmatched is logged and dropped.
pub struct SubscriptionRouter {
    handlers: HashMap<String, MessageHandler>,
}

impl SubscriptionRouter {
    pub fn new(subscriptions: Vec<(String, MessageHandler)>) -> Self {
        Self {
            handlers: subscriptions.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub async fn route(&self, topic: &str, payload: &[u8]) {
        match self.handlers.get(topic) {
            Some(handler) => handler.handle(topic, payload).await,
            None => warn!("no subscription for inbound topic {topic}"),
        }
    }
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::UnixListener;
    use tokio::task::JoinHandle;

    fn reporter() -> Reporter {
        Reporter::new("test", false, false)
    }

    /// Listener that accepts one connection and returns the line it carried.
    fn sink_listener(listener: UnixListener) -> JoinHandle<String> {
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut lines = BufReader::new(stream).lines();
            lines.next_line().await.unwrap().unwrap()
        })
    }

    #[tokio::test]
    async fn forwards_decoded_payload_to_the_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gases.uds");
        let received = sink_listener(UnixListener::bind(&path).unwrap());

        let handler = MessageHandler::new(IpcEndpoint::UnixSocket(path), false, reporter());
        handler
            .handle("site/1/gases", br#"{"tag": "x1", "val": {"NO2": 12.3}}"#)
            .await;

        assert_eq!(
            received.await.unwrap(),
            r#"{"tag":"x1","val":{"NO2":12.3}}"#
        );
    }

    #[tokio::test]
    async fn wrap_mode_keys_the_line_by_topic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("climate.uds");
        let received = sink_listener(UnixListener::bind(&path).unwrap());

        let handler = MessageHandler::new(IpcEndpoint::UnixSocket(path), true, reporter());
        handler.handle("site/1/climate", br#"{"hmd": 68.5}"#).await;

        assert_eq!(
            received.await.unwrap(),
            r#"{"site/1/climate":{"hmd":68.5}}"#
        );
    }

    #[tokio::test]
    async fn malformed_payload_is_dropped_without_touching_the_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gases.uds");
        let listener = UnixListener::bind(&path).unwrap();

        let handler =
            MessageHandler::new(IpcEndpoint::UnixSocket(path), false, reporter());
        handler.handle("site/1/gases", b"{not json").await;

        // No connection was made, so accept is still pending.
        let pending =
            tokio::time::timeout(std::time::Duration::from_millis(50), listener.accept()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn refused_sink_on_one_subscription_leaves_others_delivering() {
        let dir = tempfile::tempdir().unwrap();
        let a_path = dir.path().join("a.uds");
        let received = sink_listener(UnixListener::bind(&a_path).unwrap());

        let router = SubscriptionRouter::new(vec![
            (
                "a".to_string(),
                MessageHandler::new(IpcEndpoint::UnixSocket(a_path), false, reporter()),
            ),
            (
                "b".to_string(),
                // Nobody listens here.
                MessageHandler::new(
                    IpcEndpoint::UnixSocket(dir.path().join("b.uds")),
                    false,
                    reporter(),
                ),
            ),
        ]);

        // The refused sink reports and drops; the healthy one still delivers.
        router.route("b", br#"{"n": 1}"#).await;
        router.route("a", br#"{"n": 2}"#).await;

        assert_eq!(received.await.unwrap(), r#"{"n":2}"#);
    }

    #[tokio::test]
    async fn unmatched_topic_is_dropped() {
        let router = SubscriptionRouter::new(Vec::new());
        assert!(router.is_empty());

        // Must not panic.
        router.route("site/1/gases", br#"{"n": 1}"#).await;
    }
}
