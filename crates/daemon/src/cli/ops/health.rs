use clap::Args;
use url::Url;

use common::ledger::RpcEndpoint;
use docverify_daemon::state::AppState;

#[derive(Args, Debug, Clone)]
pub struct Health;

#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("invalid daemon URL: {0}")]
    Url(#[from] url::ParseError),
}

/// One status line for a daemon health endpoint.
async fn check_endpoint(client: &reqwest::Client, base: &Url, path: &str) -> Result<String, HealthError> {
    let url = base.join(path)?;
    let status = match client.get(url).send().await {
        Ok(resp) if resp.status().is_success() => "OK".to_string(),
        Ok(resp) => {
            let status = resp.status();
            // readyz names the failing dependency
            let detail = resp
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| body["message"].as_str().map(str::to_string));
            match detail {
                Some(detail) => format!("UNHEALTHY ({}: {})", status, detail),
                None => format!("UNHEALTHY ({})", status),
            }
        }
        Err(_) => "NOT REACHABLE".to_string(),
    };
    Ok(status)
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Health {
    type Error = HealthError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut lines = Vec::new();

        // 1. Check config directory
        lines.push("Config:".to_string());
        match AppState::load(ctx.config_path.clone()) {
            Ok(state) => {
                let config = &state.config;
                lines.push(format!("  directory:      {}", state.docverify_dir.display()));
                lines.push("  config.toml:    OK".to_string());
                lines.push(format!("  api_port:       {}", config.api_port));
                lines.push(format!("  fingerprint:    {}", config.fingerprint_scheme));
                let endpoint = match &config.ledger.endpoint {
                    RpcEndpoint::Local { url } => url.to_string(),
                    RpcEndpoint::Infura { network } => format!("infura ({})", network),
                };
                lines.push(format!("  ledger:         {}", endpoint));
                match config.ledger.contract_address {
                    Some(contract) => lines.push(format!("  contract:       {}", contract)),
                    None => lines.push("  contract:       not set".to_string()),
                }
            }
            Err(e) => {
                lines.push(format!("  error: {}", e));
            }
        }

        // 2. Ask the daemon
        let base = ctx.client.base_url();
        let client = ctx.client.http_client();

        lines.push(String::new());
        lines.push(format!("Daemon ({}):", base));
        lines.push(format!(
            "  livez:  {}",
            check_endpoint(client, base, "/_status/livez").await?
        ));
        lines.push(format!(
            "  readyz: {}",
            check_endpoint(client, base, "/_status/readyz").await?
        ));

        Ok(lines.join("\n"))
    }
}
