use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use common::content_store::PinataCredentials;
use common::ledger::{Address, LocalKey};
use docverify_daemon::state::{AppState, StateError};
use docverify_daemon::{spawn_service, ServiceConfig};

#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Override API server port (default from config)
    #[arg(long)]
    pub api_port: Option<u16>,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Serve verification and retrieval only; no signer needed
    #[arg(long)]
    pub read_only: bool,

    /// Registry contract address (overrides config)
    #[arg(long, env = "DOCVERIFY_CONTRACT_ADDRESS")]
    pub contract_address: Option<Address>,

    /// Hex private key that signs registrations
    #[arg(long, env = "DOCVERIFY_SIGNING_KEY", hide_env_values = true)]
    pub signing_key: Option<LocalKey>,

    #[arg(long, env = "DOCVERIFY_PINATA_API_KEY", hide_env_values = true)]
    pub pinata_api_key: Option<String>,

    #[arg(long, env = "DOCVERIFY_PINATA_SECRET_KEY", hide_env_values = true)]
    pub pinata_secret_key: Option<String>,

    /// Project id for an Infura ledger endpoint
    #[arg(long, env = "DOCVERIFY_INFURA_PROJECT_ID", hide_env_values = true)]
    pub infura_project_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("state error: {0}")]
    StateError(#[from] StateError),
}

impl Daemon {
    fn service_config(&self, state: AppState) -> ServiceConfig {
        let config = state.config;

        let pinata_credentials = match (&self.pinata_api_key, &self.pinata_secret_key) {
            (Some(key), Some(secret)) => Some(PinataCredentials::new(key, secret)),
            _ => None,
        };

        ServiceConfig {
            api_port: self.api_port.unwrap_or(config.api_port),
            fingerprint_scheme: config.fingerprint_scheme,
            http_timeout: Duration::from_secs(config.http_timeout_secs),
            content_store: config.content_store,
            pinata_credentials,
            ledger: config.ledger,
            contract_address: self.contract_address,
            infura_project_id: self.infura_project_id.clone(),
            signing_key: self.signing_key.clone(),
            read_only: self.read_only,
            log_level: tracing::Level::INFO,
            log_dir: self.log_dir.clone(),
        }
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;
        let config = self.service_config(state);

        spawn_service(&config).await;
        Ok("daemon ended".to_string())
    }
}
