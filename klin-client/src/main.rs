use clap::Parser;
use klin_client::{Cli, run};

#[tokio::main]
async fn main() -> Result<(), klin_client::AppError> {
    run(Cli::parse()).await
}
