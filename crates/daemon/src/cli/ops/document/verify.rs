use docverify_daemon::http_server::api::client::ApiError;
use docverify_daemon::http_server::api::v0::documents::VerifyRequest;

#[async_trait::async_trait]
impl crate::cli::op::Op for VerifyRequest {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let result = ctx.client.call(self.clone()).await?;

        if !result.exists {
            return Ok(format!("Not registered: {}", self.fingerprint.trim()));
        }

        let mut lines = vec![format!("Registered: {}", self.fingerprint.trim())];
        if let Some(owner) = &result.owner {
            lines.push(format!("  owner:     {}", owner));
        }
        if let Some(cid) = &result.ipfs_cid {
            lines.push(format!("  cid:       {}", cid));
        }
        if let Some(timestamp) = &result.timestamp {
            lines.push(format!("  timestamp: {}", timestamp.to_rfc3339()));
        }
        Ok(lines.join("\n"))
    }
}
