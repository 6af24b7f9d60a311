//! Trapper CLI entry point.

use trapper_lib::cli::{self, Cli};
use trapper_lib::core::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse_args();

    // Execute the command
    cli::execute(cli).await
}
