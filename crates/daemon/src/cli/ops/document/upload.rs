use std::path::PathBuf;

use clap::Args;

use docverify_daemon::http_server::api::client::ApiError;
use docverify_daemon::http_server::api::v0::documents::UploadRequest;

#[derive(Args, Debug, Clone)]
pub struct Upload {
    /// Path of the document on the local filesystem
    #[arg(long)]
    pub file: PathBuf,

    /// Registry contract to register against (defaults to the daemon's)
    #[arg(long)]
    pub contract_address: Option<String>,

    /// Store the document encrypted under this password
    #[arg(long, env = "DOCVERIFY_DOCUMENT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentUploadError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, std::io::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Upload {
    type Error = DocumentUploadError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let content = std::fs::read(&self.file)
            .map_err(|e| DocumentUploadError::Io(self.file.clone(), e))?;
        let file_name = self
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let request = UploadRequest {
            file_name,
            content,
            contract_address: self.contract_address.clone(),
            password: self.password.clone(),
        };
        let result = ctx.client.call(request).await?;

        let mut lines = vec![format!(
            "Uploaded {} ({} bytes)",
            result.file_name.as_deref().unwrap_or("document"),
            result.size.unwrap_or_default()
        )];
        if let Some(hash) = &result.hash {
            lines.push(format!("  fingerprint: {}", hash));
        }
        if let Some(cid) = &result.cid {
            lines.push(format!("  cid:         {}", cid));
        }
        if result.encrypted {
            lines.push("  encrypted:   yes (retrieve with the same --password)".to_string());
        }
        match (&result.tx_hash, &result.registration_error) {
            (Some(tx), _) => lines.push(format!("  tx:          {}", tx)),
            (None, Some(error)) => lines.push(format!("  NOT REGISTERED: {}", error)),
            (None, None) => {}
        }

        Ok(lines.join("\n"))
    }
}
