use std::path::PathBuf;

use clap::Args;

use docverify_daemon::http_server::api::client::ApiError;
use docverify_daemon::http_server::api::v0::documents::RetrieveRequest;

#[derive(Args, Debug, Clone)]
pub struct Retrieve {
    /// CID the document was stored under
    #[arg(long)]
    pub cid: String,

    /// Name for the download (also picks the content type)
    #[arg(long)]
    pub file_name: Option<String>,

    /// Where to write the document (defaults to the file name, or the CID)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Decrypt a document that was uploaded with a password
    #[arg(long, env = "DOCVERIFY_DOCUMENT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentRetrieveError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("failed to write {0}: {1}")]
    Io(PathBuf, std::io::Error),
}

impl Retrieve {
    fn output_path(&self) -> PathBuf {
        match (&self.output, &self.file_name) {
            (Some(output), _) => output.clone(),
            (None, Some(file_name)) => PathBuf::from(file_name),
            (None, None) => PathBuf::from(self.cid.trim()),
        }
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Retrieve {
    type Error = DocumentRetrieveError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let request = RetrieveRequest {
            cid: self.cid.clone(),
            file_name: self.file_name.clone(),
            password: self.password.clone(),
        };
        let content = ctx.client.call_raw(request).await?;

        let output = self.output_path();
        std::fs::write(&output, &content).map_err(|e| DocumentRetrieveError::Io(output.clone(), e))?;

        Ok(format!(
            "Wrote {} bytes to {}",
            content.len(),
            output.display()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retrieve(file_name: Option<&str>, output: Option<&str>) -> Retrieve {
        Retrieve {
            cid: "bafkreihdwdcefgh4dqkjv67uzcmw7ojee6xedzdetojuzjevtenxquvyku".into(),
            file_name: file_name.map(str::to_string),
            output: output.map(PathBuf::from),
            password: None,
        }
    }

    #[test]
    fn test_output_path_precedence() {
        assert_eq!(
            retrieve(Some("a.pdf"), Some("/tmp/out.pdf")).output_path(),
            PathBuf::from("/tmp/out.pdf")
        );
        assert_eq!(retrieve(Some("a.pdf"), None).output_path(), PathBuf::from("a.pdf"));
        assert_eq!(
            retrieve(None, None).output_path(),
            PathBuf::from("bafkreihdwdcefgh4dqkjv67uzcmw7ojee6xedzdetojuzjevtenxquvyku")
        );
    }
}
