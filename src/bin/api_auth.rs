//! Store or read the HTTP data-service credential document.
//!
//! ```text
//! api-auth -e api.example.com -a de92c5ff-b47a-4cc4-a04c-62d684d64a1f
//! ```
//!
//! Document example:
//! `{"endpoint": "api.example.com", "api-key": "de92c5ff-b47a-4cc4-a04c-62d684d64a1f"}`

use std::process::ExitCode;

use clap::Parser;

use telebridge::auth::{ApiAuth, AuthStore, API_AUTH_FILE};

#[derive(Debug, Parser)]
#[command(
    name = "api-auth",
    version,
    about = "Store or read the HTTP data-service credential document"
)]
struct Args {
    /// Data-service endpoint host
    #[arg(short = 'e', long = "endpoint", value_name = "ENDPOINT")]
    endpoint: Option<String>,

    /// API key
    #[arg(short = 'a', long = "api-key", value_name = "API_KEY")]
    api_key: Option<String>,

    /// Delete the stored document
    #[arg(short = 'd', long = "delete", conflicts_with_all = ["endpoint", "api_key"])]
    delete: bool,

    /// Report narrative to stderr
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let store = match AuthStore::from_env() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("api-auth: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut auth: Option<ApiAuth> = match store.load(API_AUTH_FILE) {
        Ok(auth) => auth,
        Err(e) => {
            eprintln!("api-auth: {e}");
            return ExitCode::FAILURE;
        }
    };

    let setting = args.endpoint.is_some() || args.api_key.is_some();

    if setting {
        let complete = args.endpoint.is_some() && args.api_key.is_some();

        let next = match &auth {
            None if !complete => {
                eprintln!("api-auth: No document is stored. You must therefore set all fields.");
                return ExitCode::FAILURE;
            }
            stored => ApiAuth {
                endpoint: args
                    .endpoint
                    .or_else(|| stored.as_ref().map(|a| a.endpoint.clone()))
                    .unwrap_or_default(),
                api_key: args
                    .api_key
                    .or_else(|| stored.as_ref().map(|a| a.api_key.clone()))
                    .unwrap_or_default(),
            },
        };

        if let Err(e) = store.save(API_AUTH_FILE, &next) {
            eprintln!("api-auth: {e}");
            return ExitCode::FAILURE;
        }

        if args.verbose {
            eprintln!("api-auth: saved");
        }

        auth = Some(next);
    }

    if args.delete {
        if let Err(e) = store.delete(API_AUTH_FILE) {
            eprintln!("api-auth: {e}");
            return ExitCode::FAILURE;
        }

        auth = None;
    }

    if let Some(auth) = auth {
        match serde_json::to_string(&auth) {
            Ok(line) => println!("{line}"),
            Err(e) => {
                eprintln!("api-auth: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
