//! Bridge sensor telemetry between an MQTT broker and local inter-process
//! channels (standard I/O or Unix domain sockets).
//!
//! The core of the crate is the bridge pipeline: one [`broker::BrokerConnection`]
//! fans inbound topic messages out to per-subscription sinks via a
//! [`handler::SubscriptionRouter`], while a [`bridge::PublishLoop`] drains a
//! local [`ipc::IpcEndpoint`] source and publishes each line to the broker
//! under a selectable retry policy. The remaining modules back the auxiliary
//! command-line utilities: credential storage, low-pass filtering, error-grid
//! statistics and topic-metadata lookup.

pub mod auth;
pub mod bridge;
pub mod broker;
pub mod filter;
pub mod grid;
pub mod handler;
pub mod ipc;
pub mod lookup;
pub mod pathdict;
pub mod publication;
pub mod report;
