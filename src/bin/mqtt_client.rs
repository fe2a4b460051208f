//! Bridge between an MQTT broker and local IPC channels.
//!
//! Documents for publication are read from stdin by default, otherwise from
//! the specified Unix domain socket. Documents gained from subscriptions are
//! written to stdout, or to the socket named per subscription.
//!
//! Only one MQTT client should run at any one time, per TCP/IP host.
//!
//! ```text
//! gases-sampler | mqtt-client -v site/1/control@/tmp/control.uds
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::sync::watch;
use tracing::debug;

use telebridge::auth::{ApiAuth, AuthStore, ClientAuth, API_AUTH_FILE, CLIENT_AUTH_FILE};
use telebridge::bridge::{persistent_delays, PublicationMode, PublishLoop, RetryPolicy};
use telebridge::broker::BrokerConnection;
use telebridge::handler::{MessageHandler, SubscriptionRouter};
use telebridge::ipc::IpcEndpoint;
use telebridge::lookup::TopicFinder;
use telebridge::report::{fault_report, Reporter};

#[derive(Debug, Parser)]
#[command(
    name = "mqtt-client",
    version,
    about = "Bridge sensor telemetry between an MQTT broker and local IPC channels"
)]
struct Args {
    /// Read publish requests from this Unix domain socket instead of stdin
    #[arg(short = 'p', long = "uds-pub", value_name = "UDS_PUB")]
    uds_pub: Option<PathBuf>,

    /// Treat input lines as bare payloads for this fixed topic
    #[arg(short = 't', long = "topic", value_name = "TOPIC")]
    topic: Option<String>,

    /// Verify the publish topic against the metadata service before starting
    #[arg(long = "check-topic", requires = "topic")]
    check_topic: bool,

    /// One publish attempt per line instead of persistent retry
    #[arg(long = "best-effort")]
    best_effort: bool,

    /// Wrap forwarded subscription output as {"<topic>": {...}}
    #[arg(short = 'w', long = "wrap")]
    wrap: bool,

    /// Repeat input and forwarded lines on stdout
    #[arg(short = 'e', long = "echo")]
    echo: bool,

    /// Report narrative to stderr
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Subscriptions, each delivered to its own sink
    #[arg(value_name = "SUB_TOPIC[@UDS_ADDR]")]
    subscriptions: Vec<String>,
}

/// `topic` or `topic@/socket/path`; no address selects stdout.
fn parse_subscription(spec: &str) -> (String, IpcEndpoint) {
    match spec.split_once('@') {
        Some((topic, address)) => (topic.to_string(), IpcEndpoint::UnixSocket(address.into())),
        None => (spec.to_string(), IpcEndpoint::Stdio),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_writer(std::io::stderr)
        .init();

    let reporter = Reporter::new("mqtt-client", args.verbose, args.echo);

    // resources...
    let store = match AuthStore::from_env() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("mqtt-client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let auth: ClientAuth = match store.load(CLIENT_AUTH_FILE) {
        Ok(Some(auth)) => auth,
        Ok(None) => {
            eprintln!("mqtt-client: ClientAuth not available.");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("mqtt-client: {e}");
            return ExitCode::FAILURE;
        }
    };

    reporter.diag(&format!("endpoint: {}", auth.endpoint));

    if args.check_topic {
        if let Some(code) = check_topic(&store, args.topic.as_deref().unwrap_or_default()).await {
            return code;
        }
    }

    let subscriptions = args
        .subscriptions
        .iter()
        .map(|spec| {
            let (topic, sink) = parse_subscription(spec);
            debug!("subscription: {topic} -> {sink:?}");
            (topic, MessageHandler::new(sink, args.wrap, reporter.clone()))
        })
        .collect();

    let router = SubscriptionRouter::new(subscriptions);

    let mut connection = match BrokerConnection::new(&auth, &store, router) {
        Ok(connection) => connection,
        Err(e) => {
            eprintln!("{}", fault_report("credentials", &e.to_string()));
            return ExitCode::FAILURE;
        }
    };

    // run...
    if let Err(e) = connection.connect().await {
        eprintln!("{}", fault_report("connect", &e.to_string()));
        return ExitCode::FAILURE;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let source_endpoint = IpcEndpoint::from_address(args.uds_pub);
    let mut source = match source_endpoint.open_source().await {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{}", fault_report("source", &e.to_string()));
            connection.disconnect().await;
            return ExitCode::FAILURE;
        }
    };

    let mode = match args.topic {
        Some(topic) => PublicationMode::FixedTopic(topic),
        None => PublicationMode::Addressed,
    };

    let policy = if args.best_effort {
        RetryPolicy::BestEffort
    } else {
        RetryPolicy::Persistent
    };

    let outcome = PublishLoop::new(
        &connection,
        mode,
        policy,
        persistent_delays(),
        shutdown_rx,
        reporter.clone(),
    )
    .run(&mut source)
    .await;

    // end...
    connection.disconnect().await;

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", fault_report("source", &e.to_string()));
            ExitCode::FAILURE
        }
    }
}

/// Pre-flight check of the publish topic. `Some(code)` aborts startup.
async fn check_topic(store: &AuthStore, topic: &str) -> Option<ExitCode> {
    let auth: ApiAuth = match store.load(API_AUTH_FILE) {
        Ok(Some(auth)) => auth,
        Ok(None) => {
            eprintln!("mqtt-client: ApiAuth not available.");
            return Some(ExitCode::FAILURE);
        }
        Err(e) => {
            eprintln!("mqtt-client: {e}");
            return Some(ExitCode::FAILURE);
        }
    };

    match TopicFinder::new(&auth).find(topic).await {
        Ok(Some(_)) => None,
        Ok(None) => {
            eprintln!("mqtt-client: Topic not available.");
            Some(ExitCode::FAILURE)
        }
        Err(e) => {
            eprintln!("{}", fault_report("lookup", &e.to_string()));
            Some(ExitCode::FAILURE)
        }
    }
}
