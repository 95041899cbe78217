use clap::{Args, Subcommand};

pub mod retrieve;
pub mod upload;
pub mod verify;

use crate::cli::op::Op;
use docverify_daemon::http_server::api::v0::documents::VerifyRequest;

crate::command_enum! {
    (Upload, upload::Upload),
    (Verify, VerifyRequest),
    (Retrieve, retrieve::Retrieve),
}

pub type DocumentCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Document {
    #[command(subcommand)]
    pub command: DocumentCommand,
}

#[async_trait::async_trait]
impl Op for Document {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
