use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    claimflow_cli::run().await
}
