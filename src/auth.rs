use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const CLIENT_AUTH_FILE: &str = "client_auth.json";
pub const API_AUTH_FILE: &str = "api_auth.json";

const CERTS_DIR: &str = "certs";
const ENV_DIR: &str = "TELEBRIDGE_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("home directory not available")]
    MissingHome,

    #[error("configuration i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed configuration document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Credentials for the broker session: endpoint host, client identifier and
/// the identifier of the TLS certificate material on disk.
///
/// Document example:
/// `{"endpoint": "mqtt.example.com", "client-id": "bruno", "cert-id": "9f08402232"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAuth {
    pub endpoint: String,

    #[serde(rename = "client-id")]
    pub client_id: String,

    #[serde(rename = "cert-id")]
    pub cert_id: String,
}

/// Credentials for the HTTP topic-metadata service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiAuth {
    pub endpoint: String,

    #[serde(rename = "api-key")]
    pub api_key: String,
}

/// On-disk store for credential documents, one JSON file per document under
/// the base directory (`$TELEBRIDGE_DIR`, or `~/.telebridge`).
#[derive(Debug, Clone)]
pub struct AuthStore {
    base: PathBuf,
}

impl AuthStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Resolve the base directory. A `.env` file is honoured first, matching
    /// the other utilities' startup path.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        if let Ok(dir) = env::var(ENV_DIR) {
            return Ok(Self::new(dir));
        }

        let home = env::var("HOME").map_err(|_| ConfigError::MissingHome)?;
        Ok(Self::new(Path::new(&home).join(".telebridge")))
    }

    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ConfigError> {
        let path = self.base.join(name);

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no document at {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_str(&text)?))
    }

    pub fn save<T: Serialize>(&self, name: &str, document: &T) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.base)?;
        fs::write(self.base.join(name), serde_json::to_string(document)?)?;

        Ok(())
    }

    /// Idempotent: deleting an absent document is not an error.
    pub fn delete(&self, name: &str) -> Result<(), ConfigError> {
        match fs::remove_file(self.base.join(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn certificate_path(&self, auth: &ClientAuth) -> PathBuf {
        self.base
            .join(CERTS_DIR)
            .join(format!("{}-certificate.pem.crt", auth.cert_id))
    }

    pub fn private_key_path(&self, auth: &ClientAuth) -> PathBuf {
        self.base
            .join(CERTS_DIR)
            .join(format!("{}-private.pem.key", auth.cert_id))
    }

    pub fn root_ca_path(&self) -> PathBuf {
        self.base.join(CERTS_DIR).join("root-CA.crt")
    }
}

// --------------------------------------------------------------------------
