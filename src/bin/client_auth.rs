//! Store or read the broker credential document.
//!
//! ```text
//! client-auth -e mqtt.example.com -c bruno -i 9f08402232
//! ```
//!
//! Document example:
//! `{"endpoint": "mqtt.example.com", "client-id": "bruno", "cert-id": "9f08402232"}`

use std::process::ExitCode;

use clap::Parser;

use telebridge::auth::{AuthStore, ClientAuth, CLIENT_AUTH_FILE};

#[derive(Debug, Parser)]
#[command(
    name = "client-auth",
    version,
    about = "Store or read the MQTT broker credential document"
)]
struct Args {
    /// Broker endpoint host
    #[arg(short = 'e', long = "endpoint", value_name = "ENDPOINT")]
    endpoint: Option<String>,

    /// MQTT client identifier
    #[arg(short = 'c', long = "client-id", value_name = "CLIENT_ID")]
    client_id: Option<String>,

    /// Identifier of the TLS certificate material
    #[arg(short = 'i', long = "cert-id", value_name = "CERT_ID")]
    cert_id: Option<String>,

    /// Delete the stored document
    #[arg(
        short = 'd',
        long = "delete",
        conflicts_with_all = ["endpoint", "client_id", "cert_id"]
    )]
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
            eprintln!("client-auth: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut auth: Option<ClientAuth> = match store.load(CLIENT_AUTH_FILE) {
        Ok(auth) => auth,
        Err(e) => {
            eprintln!("client-auth: {e}");
            return ExitCode::FAILURE;
        }
    };

    let setting = args.endpoint.is_some() || args.client_id.is_some() || args.cert_id.is_some();

    if setting {
        // Partial settings merge over the stored document; with nothing
        // stored, every field must be given.
        let complete = args.endpoint.is_some() && args.client_id.is_some() && args.cert_id.is_some();

        let next = match &auth {
            None if !complete => {
                eprintln!("client-auth: No document is stored. You must therefore set all fields.");
                return ExitCode::FAILURE;
            }
            stored => ClientAuth {
                endpoint: args
                    .endpoint
                    .or_else(|| stored.as_ref().map(|a| a.endpoint.clone()))
                    .unwrap_or_default(),
                client_id: args
                    .client_id
                    .or_else(|| stored.as_ref().map(|a| a.client_id.clone()))
                    .unwrap_or_default(),
                cert_id: args
                    .cert_id
                    .or_else(|| stored.as_ref().map(|a| a.cert_id.clone()))
                    .unwrap_or_default(),
            },
        };

        if let Err(e) = store.save(CLIENT_AUTH_FILE, &next) {
            eprintln!("client-auth: {e}");
            return ExitCode::FAILURE;
        }

        if args.verbose {
            eprintln!("client-auth: saved");
        }

        auth = Some(next);
    }

    if args.delete {
        if let Err(e) = store.delete(CLIENT_AUTH_FILE) {
            eprintln!("client-auth: {e}");
            return ExitCode::FAILURE;
        }

        auth = None;
    }

    if let Some(auth) = auth {
        match serde_json::to_string(&auth) {
            Ok(line) => println!("{line}"),
            Err(e) => {
                eprintln!("client-auth: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
