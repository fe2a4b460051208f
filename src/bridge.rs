use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::watch;
use tokio::time::sleep;
use tokio_retry::strategy::{jitter, FixedInterval};

use crate::broker::Broker;
use crate::ipc::IpcSource;
use crate::publication::Publication;
use crate::report::Reporter;

/// How publish failures are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// One attempt per line; failures are reported and the line is skipped.
    BestEffort,
    /// Retry the same publication until delivered, sleeping a jittered
    /// interval between attempts. Abandoned only on shutdown.
    Persistent,
}

/// Shape of the documents read from the inbound source.
#[derive(Debug, Clone)]
pub enum PublicationMode {
    /// Every line is a bare payload for this fixed topic.
    FixedTopic(String),
    /// Every line is a `{"topic": .., "payload": ..}` request.
    Addressed,
}

const BASE_DELAY: Duration = Duration::from_secs(1);

/// Inter-attempt delays for the persistent policy: one base interval plus up
/// to one interval of uniform jitter, i.e. 1.0 to 2.0 seconds. Spreads
/// retries so a struggling broker is not hammered in lock-step.
pub fn persistent_delays() -> impl Iterator<Item = Duration> {
    FixedInterval::new(BASE_DELAY).map(|base| base + jitter(base))
}

/// Drains an inbound source, turning each line into a broker publication.
///
/// Malformed lines never terminate the loop; they are reported in verbose
/// mode and skipped. Publications are issued strictly in input order.
pub struct PublishLoop<'a, B, D>
where
    B: Broker,
    D: Iterator<Item = Duration>,
{
    broker: &'a B,
    mode: PublicationMode,
    policy: RetryPolicy,
    delays: D,
    shutdown: watch::Receiver<bool>,
    reporter: Reporter,
}

impl<'a, B, D> PublishLoop<'a, B, D>
where
    B: Broker,
    D: Iterator<Item = Duration>,
{
    pub fn new(
        broker: &'a B,
        mode: PublicationMode,
        policy: RetryPolicy,
        delays: D,
        shutdown: watch::Receiver<bool>,
        reporter: Reporter,
    ) -> Self {
        Self {
            broker,
            mode,
            policy,
            delays,
            shutdown,
            reporter,
        }
    }

    /// Run to completion: source exhausted, or shutdown signalled. I/O errors
    /// on the source itself are the only way out with an `Err`.
    pub async fn run(mut self, source: &mut IpcSource) -> std::io::Result<()> {
        loop {
            let line = tokio::select! {
                _ = self.shutdown.changed() => {
                    self.reporter.diag("interrupted");
                    break;
                }
                line = source.next_line() => match line? {
                    Some(line) => line,
                    None => break,
                },
            };

            let Some(publication) = self.decode(&line) else {
                self.reporter.diag(&format!("bad datum: {}", line.trim()));
                continue;
            };

            self.reporter.diag(&format!("received: {}", publication.topic));

            let delivered = self.publish(&publication).await;
            self.reporter.diag(if delivered { "done" } else { "abandoned" });

            self.reporter.echo(&line);

            if *self.shutdown.borrow() {
                break;
            }
        }

        Ok(())
    }

    fn decode(&self, line: &str) -> Option<Publication> {
        let doc: Map<String, Value> = serde_json::from_str(line).ok()?;

        match &self.mode {
            PublicationMode::FixedTopic(topic) => Some(Publication::new(topic.clone(), doc)),
            PublicationMode::Addressed => Publication::from_request(&doc),
        }
    }

    /// Resolve one publication under the configured policy. Returns whether
    /// the broker reported delivery.
    async fn publish(&mut self, publication: &Publication) -> bool {
        loop {
            match self.broker.publish(publication).await {
                Ok(true) => return true,
                Ok(false) => self.reporter.diag("not delivered"),
                Err(e) => self.reporter.diag(&e.to_string()),
            }

            if self.policy == RetryPolicy::BestEffort {
                return false;
            }

            let delay = self.delays.next().unwrap_or(BASE_DELAY);
            tokio::select! {
                _ = self.shutdown.changed() => return false,
                _ = sleep(delay) => {}
            }
        }
    }
}

// --------------------------------------------------------------------------
