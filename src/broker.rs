use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ClientError, Event, MqttOptions, Packet, QoS, TlsConfiguration, Transport,
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::auth::{AuthStore, ClientAuth};
use crate::handler::SubscriptionRouter;
use crate::publication::Publication;

pub const MQTT_PORT: u16 = 8883;

const KEEP_ALIVE: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("credential material unreadable: {0}")]
    Credentials(#[from] std::io::Error),

    #[error("broker unreachable: {0}")]
    Unreachable(String),

    #[error("broker rejected the session: {0}")]
    Rejected(String),

    #[error("connect timed out")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("network failure")]
    NetworkFailure,

    #[error("publish timed out")]
    Timeout,

    #[error("protocol error: {0}")]
    ProtocolError(String),
}

/// The publish capability of a live broker session. The bridge's retry
/// policies run against this seam, so they can be exercised with a scripted
/// stand-in instead of a network.
#[async_trait]
pub trait Broker: Send + Sync {
    /// `Ok(false)` is a soft failure: the broker is reachable but the publish
    /// was not accepted, e.g. the request queue is saturated.
    async fn publish(&self, publication: &Publication) -> Result<bool, PublishError>;
}

/// One MQTT session: TLS connect with the stored credentials, subscription
/// registration, inbound routing on a background task, and publish.
///
/// Only one broker connection should be live per broker identity on a host;
/// this is an operational constraint, not enforced in-process.
pub struct BrokerConnection {
    options: MqttOptions,
    router: Arc<SubscriptionRouter>,
    client: Option<AsyncClient>,
    poller: Option<JoinHandle<()>>,
}

impl BrokerConnection {
    /// Reads the certificate material named by the credential document.
    /// No network activity until [`connect`](Self::connect).
    pub fn new(
        auth: &ClientAuth,
        store: &AuthStore,
        router: SubscriptionRouter,
    ) -> Result<Self, ConnectError> {
        let ca = std::fs::read(store.root_ca_path())?;
        let cert = std::fs::read(store.certificate_path(auth))?;
        let key = std::fs::read(store.private_key_path(auth))?;

        let mut options = MqttOptions::new(&auth.client_id, &auth.endpoint, MQTT_PORT);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_clean_session(true);
        options.set_transport(Transport::Tls(TlsConfiguration::Simple {
            ca,
            alpn: None,
            client_auth: Some((cert, key)),
        }));

        Ok(Self {
            options,
            router: Arc::new(router),
            client: None,
            poller: None,
        })
    }

    /// Establish the session, register every declared subscription, then hand
    /// the event loop to a background task so inbound delivery begins
    /// immediately. Must complete before [`Broker::publish`] is usable.
    pub async fn connect(&mut self) -> Result<(), ConnectError> {
        let (client, mut eventloop) = AsyncClient::new(self.options.clone(), 10);

        // Drive the event loop by hand until the broker acknowledges the
        // session, so a dead endpoint fails here rather than mid-pipeline.
        let acknowledged = timeout(CONNECT_TIMEOUT, async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                    Ok(event) => debug!("pre-connect event: {event:?}"),
                    Err(e) => return Err(ConnectError::Unreachable(e.to_string())),
                }
            }
        })
        .await;

        match acknowledged {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(ConnectError::Timeout),
        }

        info!("connected to {}", self.options.broker_address().0);

        let topics: Vec<String> = self.router.topics().map(str::to_string).collect();
        for topic in topics {
            client
                .subscribe(&topic, QoS::AtLeastOnce)
                .await
                .map_err(|e| ConnectError::Rejected(e.to_string()))?;
            debug!("subscribed to {topic}");
        }

        let router = self.router.clone();
        let poll_client = client.clone();
        let poller = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(event) => match classify(&event) {
                        // Routed inline: broker-assigned order per topic is
                        // preserved by never dispatching concurrently.
                        EventAction::Route(publish) => {
                            router.route(&publish.topic, &publish.payload).await;
                        }
                        EventAction::Resubscribe => {
                            for topic in router.topics() {
                                match poll_client.subscribe(topic, QoS::AtLeastOnce).await {
                                    Ok(()) => debug!("resubscribed to {topic}"),
                                    Err(e) => warn!("resubscribe to {topic} failed: {e}"),
                                }
                            }
                        }
                        EventAction::Ignore => debug!("event: {event:?}"),
                    },
                    Err(e) => {
                        // poll() re-establishes the session on the next call.
                        warn!("event loop error: {e}");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                    }
                }
            }
        });

        self.client = Some(client);
        self.poller = Some(poller);

        Ok(())
    }

    /// Idempotent; safe to call before a successful connect and repeatedly.
    pub async fn disconnect(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }

        if let Some(client) = self.client.take() {
            if let Err(e) = client.disconnect().await {
                debug!("disconnect: {e}");
            }
        }
    }
}

/// What the live event loop does with one polled event. The session's first
/// `ConnAck` is consumed during [`BrokerConnection::connect`], so any later
/// one means the event loop reconnected; with clean sessions the broker has
/// forgotten every subscription at that point.
enum EventAction<'a> {
    Route(&'a rumqttc::Publish),
    Resubscribe,
    Ignore,
}

fn classify(event: &Event) -> EventAction<'_> {
    match event {
        Event::Incoming(Packet::Publish(publish)) => EventAction::Route(publish),
        Event::Incoming(Packet::ConnAck(_)) => EventAction::Resubscribe,
        _ => EventAction::Ignore,
    }
}

#[async_trait]
impl Broker for BrokerConnection {
    async fn publish(&self, publication: &Publication) -> Result<bool, PublishError> {
        let client = self.client.as_ref().ok_or(PublishError::NetworkFailure)?;
        let payload = publication.payload_line();

        let outcome = timeout(
            PUBLISH_TIMEOUT,
            client.publish(publication.topic.as_str(), QoS::AtLeastOnce, false, payload),
        )
        .await;

        match outcome {
            Ok(Ok(())) => Ok(true),
            // Request queue saturated: the session is up, the publish was not
            // accepted. Soft failure for the retry policy to resolve.
            Ok(Err(ClientError::TryRequest(_))) => Ok(false),
            Ok(Err(_)) => Err(PublishError::NetworkFailure),
            Err(_) => Err(PublishError::Timeout),
        }
    }
}

// --------------------------------------------------------------------------
