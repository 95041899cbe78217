use clap::{Args, ValueEnum};
use url::Url;

use common::content_store::ContentStoreConfig;
use common::fingerprint::FingerprintScheme;
use common::ledger::{Address, LedgerConfig, RpcEndpoint};
use docverify_daemon::state::{AppConfig, AppState, StateError, DEFAULT_API_PORT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// Hosted pinning service (credentials from the environment)
    Pinata,
    /// A local kubo node
    Local,
    /// Process memory, for development
    Memory,
}

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// API server port
    #[arg(long, default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Content store backend
    #[arg(long, value_enum, default_value_t = StoreBackend::Local)]
    pub content_store: StoreBackend,

    /// Content store API endpoint (backend default if unset)
    #[arg(long)]
    pub ipfs_api_url: Option<Url>,

    /// Content store gateway used for retrieval (backend default if unset)
    #[arg(long)]
    pub ipfs_gateway_url: Option<Url>,

    /// JSON-RPC endpoint of an Ethereum node
    #[arg(long, conflicts_with = "infura_network")]
    pub rpc_url: Option<Url>,

    /// Use Infura for this network instead of a node URL (e.g. sepolia)
    #[arg(long)]
    pub infura_network: Option<String>,

    /// Address of the deployed registry contract
    #[arg(long)]
    pub contract_address: Option<Address>,

    /// Chain id for transaction signing (queried from the node if unset)
    #[arg(long)]
    pub chain_id: Option<u64>,

    /// Account unlocked on the node, used when no signing key is given
    #[arg(long)]
    pub unlocked_account: Option<Address>,

    /// How documents are fingerprinted (sha3_256 or prefix32)
    #[arg(long, default_value_t = FingerprintScheme::Sha3_256)]
    pub fingerprint_scheme: FingerprintScheme,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
}

impl Init {
    fn app_config(&self) -> AppConfig {
        let content_store = match self.content_store {
            StoreBackend::Pinata => ContentStoreConfig::pinata(),
            StoreBackend::Local => ContentStoreConfig::local(),
            StoreBackend::Memory => ContentStoreConfig::Memory,
        }
        .with_urls(self.ipfs_api_url.clone(), self.ipfs_gateway_url.clone());

        let endpoint = match (&self.rpc_url, &self.infura_network) {
            (Some(url), _) => RpcEndpoint::Local { url: url.clone() },
            (None, Some(network)) => RpcEndpoint::Infura {
                network: network.clone(),
            },
            (None, None) => RpcEndpoint::default(),
        };

        AppConfig {
            api_port: self.api_port,
            fingerprint_scheme: self.fingerprint_scheme,
            content_store,
            ledger: LedgerConfig {
                endpoint,
                contract_address: self.contract_address,
                chain_id: self.chain_id,
                unlocked_account: self.unlocked_account,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::init(ctx.config_path.clone(), Some(self.app_config()))?;
        let config = &state.config;

        let contract = config
            .ledger
            .contract_address
            .map(|address| address.to_string())
            .unwrap_or_else(|| "not set (pass DOCVERIFY_CONTRACT_ADDRESS to the daemon)".into());
        let endpoint = match &config.ledger.endpoint {
            RpcEndpoint::Local { url } => url.to_string(),
            RpcEndpoint::Infura { network } => format!("infura ({})", network),
        };

        let output = format!(
            "Initialized docverify directory at: {}\n\
             - Config: {}\n\
             - API port: {}\n\
             - Content store: {:?}\n\
             - Ledger endpoint: {}\n\
             - Registry contract: {}\n\
             - Fingerprint scheme: {}",
            state.docverify_dir.display(),
            state.config_path.display(),
            config.api_port,
            self.content_store,
            endpoint,
            contract,
            config.fingerprint_scheme,
        );

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        init: Init,
    }

    fn parse(args: &[&str]) -> Init {
        Cli::parse_from(std::iter::once("init").chain(args.iter().copied())).init
    }

    #[test]
    fn test_defaults_describe_local_stack() {
        let config = parse(&[]).app_config();
        assert_eq!(config.api_port, DEFAULT_API_PORT);
        assert_eq!(config.content_store, ContentStoreConfig::local());
        assert_eq!(config.ledger.endpoint, RpcEndpoint::default());
        assert_eq!(config.fingerprint_scheme, FingerprintScheme::Sha3_256);
        assert!(config.ledger.contract_address.is_none());
    }

    #[test]
    fn test_flags_reach_config() {
        let config = parse(&[
            "--content-store",
            "pinata",
            "--infura-network",
            "sepolia",
            "--contract-address",
            "0x5fbdb2315678afecb367f032d93f642f64180aa3",
            "--chain-id",
            "11155111",
            "--fingerprint-scheme",
            "prefix32",
        ])
        .app_config();

        assert_eq!(config.content_store, ContentStoreConfig::pinata());
        assert_eq!(
            config.ledger.endpoint,
            RpcEndpoint::Infura {
                network: "sepolia".into()
            }
        );
        assert_eq!(config.ledger.chain_id, Some(11155111));
        assert!(config.ledger.contract_address.is_some());
        assert_eq!(config.fingerprint_scheme, FingerprintScheme::Prefix32);
    }

    #[test]
    fn test_rpc_url_conflicts_with_infura() {
        let result = Cli::try_parse_from([
            "init",
            "--rpc-url",
            "http://localhost:8545",
            "--infura-network",
            "sepolia",
        ]);
        assert!(result.is_err());
    }
}
