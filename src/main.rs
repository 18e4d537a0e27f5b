use anyhow::Result;
use resurrector::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run_cli().await
}
