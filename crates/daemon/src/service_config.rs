use std::path::PathBuf;
use std::time::Duration;

use common::content_store::{ContentStoreConfig, PinataCredentials};
use common::fingerprint::FingerprintScheme;
use common::ledger::{Address, LedgerConfig, LocalKey};

#[derive(Debug)]
pub struct Config {
    // http server configuration
    /// Port for the API HTTP server
    pub api_port: u16,

    // registration
    pub fingerprint_scheme: FingerprintScheme,
    /// Timeout applied to every upstream HTTP request
    pub http_timeout: Duration,

    // content store configuration
    pub content_store: ContentStoreConfig,
    /// Required when the content store is the pinning service
    pub pinata_credentials: Option<PinataCredentials>,

    // ledger configuration
    pub ledger: LedgerConfig,
    /// Overrides `ledger.contract_address` from config.toml
    pub contract_address: Option<Address>,
    /// Required when the ledger endpoint is Infura
    pub infura_project_id: Option<String>,
    /// Key used to sign registrations. Without one the node must
    ///  hold `ledger.unlocked_account`
    pub signing_key: Option<LocalKey>,
    /// Serve verification and retrieval only; uploads are rejected
    ///  and no signer is required
    pub read_only: bool,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_port: crate::state::DEFAULT_API_PORT,
            fingerprint_scheme: FingerprintScheme::default(),
            http_timeout: Duration::from_secs(crate::state::DEFAULT_HTTP_TIMEOUT_SECS),
            content_store: ContentStoreConfig::default(),
            pinata_credentials: None,
            ledger: LedgerConfig::default(),
            contract_address: None,
            infura_project_id: None,
            signing_key: None,
            read_only: false,
            log_level: tracing::Level::INFO,
            log_dir: None,
        }
    }
}
