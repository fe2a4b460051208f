//! Accept newline-delimited data on a Unix domain socket and repeat it on
//! stdout. Intended as the receiving end of an `mqtt-client` subscription
//! sink:
//!
//! ```text
//! uds-receiver /tmp/gases.uds | sample-low-pass -d 10 -c 0.01 val.NO2
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::warn;

use telebridge::report::Reporter;

#[derive(Debug, Parser)]
#[command(
    name = "uds-receiver",
    version,
    about = "Accept newline-delimited data on a Unix domain socket"
)]
struct Args {
    /// Filesystem address to listen on
    #[arg(value_name = "UDS_ADDR")]
    address: PathBuf,

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

    let reporter = Reporter::new("uds-receiver", args.verbose, false);

    let listener = match claim_address(&args.address, &reporter).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("uds-receiver: cannot bind {}: {e}", args.address.display());
            return ExitCode::FAILURE;
        }
    };

    reporter.diag(&format!("listening on {}", args.address.display()));

    'accept: loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                reporter.diag("interrupted");
                break 'accept;
            }
            accepted = listener.accept() => {
                let (stream, _) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("accept failed: {e}");
                        continue;
                    }
                };

                let mut lines = BufReader::new(stream).lines();
                loop {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {
                            reporter.diag("interrupted");
                            break 'accept;
                        }
                        line = lines.next_line() => match line {
                            Ok(Some(line)) => println!("{line}"),
                            Ok(None) => break,
                            Err(e) => {
                                warn!("read failed: {e}");
                                break;
                            }
                        }
                    }
                }
            }
        }
    }

    let _ = std::fs::remove_file(&args.address);

    ExitCode::SUCCESS
}

/// Bind the listening socket. A socket file that still answers a connect
/// belongs to a live receiver and is left alone; one that refuses is stale
/// and cleared first.
async fn claim_address(address: &Path, reporter: &Reporter) -> std::io::Result<UnixListener> {
    if address.exists() {
        match UnixStream::connect(address).await {
            Ok(_) => {
                return Err(std::io::Error::new(
                    ErrorKind::AddrInUse,
                    "a receiver is already listening",
                ));
            }
            Err(_) => {
                reporter.diag(&format!("removing stale socket {}", address.display()));
                std::fs::remove_file(address)?;
            }
        }
    }

    UnixListener::bind(address)
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn reporter() -> Reporter {
        Reporter::new("test", false, false)
    }

    #[tokio::test]
    async fn stale_socket_file_is_cleared_before_binding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receiver.uds");

        // A file nobody answers on, left behind by an earlier run.
        drop(std::os::unix::net::UnixListener::bind(&path).unwrap());
        assert!(path.exists());

        let listener = claim_address(&path, &reporter()).await.unwrap();
        drop(listener);
    }

    #[tokio::test]
    async fn live_receiver_keeps_its_address() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receiver.uds");

        let live = UnixListener::bind(&path).unwrap();

        let refused = claim_address(&path, &reporter()).await;
        assert!(matches!(refused, Err(e) if e.kind() == ErrorKind::AddrInUse));

        // The live receiver still owns the address.
        assert!(path.exists());
        drop(live);
    }

    #[tokio::test]
    async fn fresh_address_binds_directly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receiver.uds");

        claim_address(&path, &reporter()).await.unwrap();
        assert!(path.exists());
    }
}
