use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::net::UnixStream;

#[derive(Debug, Error)]
pub enum SinkError {
    /// No listener behind the socket address. Recoverable per message.
    #[error("connection refused for {addr}")]
    Refused { addr: PathBuf },

    #[error("sink i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A local IPC endpoint: the process's inherited standard streams, or a Unix
/// domain socket identified by a filesystem path.
///
/// Sources are opened once and drained; sinks follow the connect / write /
/// close pattern on every line so a slow or absent peer never pins an OS
/// resource between messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpcEndpoint {
    Stdio,
    UnixSocket(PathBuf),
}

impl IpcEndpoint {
    /// Absence of an address selects standard-stream I/O.
    pub fn from_address(address: Option<PathBuf>) -> Self {
        match address {
            Some(path) => Self::UnixSocket(path),
            None => Self::Stdio,
        }
    }

    /// Open the endpoint for reading. The socket variant connects to the
    /// configured address; its line sequence ends when the peer closes.
    pub async fn open_source(&self) -> std::io::Result<IpcSource> {
        let inner = match self {
            Self::Stdio => SourceInner::Stdio(BufReader::new(tokio::io::stdin()).lines()),
            Self::UnixSocket(path) => {
                let stream = UnixStream::connect(path).await?;
                SourceInner::Socket(BufReader::new(stream).lines())
            }
        };

        Ok(IpcSource { inner })
    }

    /// Deliver one line: connect, write, close. A socket address with no
    /// listener surfaces as [`SinkError::Refused`] for the caller to handle.
    pub async fn send_line(&self, line: &str) -> Result<(), SinkError> {
        match self {
            Self::Stdio => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(line.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
            Self::UnixSocket(path) => {
                let mut stream = UnixStream::connect(path).await.map_err(|e| {
                    if matches!(e.kind(), ErrorKind::ConnectionRefused | ErrorKind::NotFound) {
                        SinkError::Refused { addr: path.clone() }
                    } else {
                        SinkError::Io(e)
                    }
                })?;
                stream.write_all(line.as_bytes()).await?;
                stream.write_all(b"\n").await?;
                stream.shutdown().await?;
            }
        }

        Ok(())
    }
}

/// A lazy line sequence read from an opened endpoint. Dropping the source
/// releases the underlying stream; closing is implicit and repeatable.
pub struct IpcSource {
    inner: SourceInner,
}

enum SourceInner {
    Stdio(Lines<BufReader<Stdin>>),
    Socket(Lines<BufReader<UnixStream>>),
}

impl IpcSource {
    /// Next line, or `None` once the source is exhausted. Blocks until data
    /// is available or the peer closes.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        match &mut self.inner {
            SourceInner::Stdio(lines) => lines.next_line().await,
            SourceInner::Socket(lines) => lines.next_line().await,
        }
    }
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::UnixListener;

    #[test]
    fn address_selects_the_variant() {
        assert_eq!(IpcEndpoint::from_address(None), IpcEndpoint::Stdio);
        assert_eq!(
            IpcEndpoint::from_address(Some("/tmp/scs.uds".into())),
            IpcEndpoint::UnixSocket("/tmp/scs.uds".into())
        );
    }

    #[tokio::test]
    async fn send_line_delivers_one_line_and_closes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sink.uds");
        let listener = UnixListener::bind(&path).unwrap();

        let endpoint = IpcEndpoint::UnixSocket(path);
        let accept = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut received = String::new();
            stream.read_to_string(&mut received).await.unwrap();
            received
        });

        endpoint.send_line(r#"{"tag":"x1"}"#).await.unwrap();

        // read_to_string returning proves the sink closed its end.
        assert_eq!(accept.await.unwrap(), "{\"tag\":\"x1\"}\n");
    }

    #[tokio::test]
    async fn missing_listener_is_a_refused_condition() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = IpcEndpoint::UnixSocket(dir.path().join("nobody.uds"));

        match endpoint.send_line("datum").await {
            Err(SinkError::Refused { addr }) => {
                assert!(addr.ends_with("nobody.uds"));
            }
            other => panic!("expected refused, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn source_yields_lines_until_peer_closes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.uds");
        let listener = UnixListener::bind(&path).unwrap();

        let writer = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(b"one\ntwo\n").await.unwrap();
        });

        let mut source = IpcEndpoint::UnixSocket(path).open_source().await.unwrap();

        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("one"));
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("two"));
        assert_eq!(source.next_line().await.unwrap(), None);

        writer.await.unwrap();
    }

    #[tokio::test]
    async fn opening_a_source_with_no_listener_fails() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = IpcEndpoint::UnixSocket(dir.path().join("nobody.uds"));

        assert!(endpoint.open_source().await.is_err());
    }
}
