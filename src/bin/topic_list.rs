//! Look a topic up in the HTTP data service and print its metadata document.
//!
//! Requires a stored ApiAuth document (see `api-auth`).
//!
//! ```text
//! topic-list south-coast-science-dev/loc/1/gases
//! ```

use std::process::ExitCode;

use clap::Parser;

use telebridge::auth::{ApiAuth, AuthStore, API_AUTH_FILE};
use telebridge::lookup::TopicFinder;
use telebridge::report::{fault_report, Reporter};

#[derive(Debug, Parser)]
#[command(
    name = "topic-list",
    version,
    about = "Look up topic metadata in the HTTP data service"
)]
struct Args {
    /// Topic path to look up
    #[arg(value_name = "TOPIC")]
    topic: String,

    /// Report narrative to stderr
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let reporter = Reporter::new("topic-list", args.verbose, false);

    let store = match AuthStore::from_env() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("topic-list: {e}");
            return ExitCode::FAILURE;
        }
    };

    let auth: ApiAuth = match store.load(API_AUTH_FILE) {
        Ok(Some(auth)) => auth,
        Ok(None) => {
            eprintln!("topic-list: ApiAuth not available.");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("topic-list: {e}");
            return ExitCode::FAILURE;
        }
    };

    reporter.diag(&format!("endpoint: {}", auth.endpoint));

    match TopicFinder::new(&auth).find(&args.topic).await {
        Ok(Some(document)) => {
            println!("{document}");
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("topic-list: Topic not available.");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{}", fault_report("lookup", &e.to_string()));
            ExitCode::FAILURE
        }
    }
}
