//! Valorix evaluation API server.
//!
//! Settings come from the process environment and an optional `.env` file
//! in the working directory. See `valorix-cli config` to inspect them.

use valorix_api::config::Settings;
use valorix_api::lifecycle;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    lifecycle::run(settings).await?;
    Ok(())
}
