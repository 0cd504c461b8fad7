use dotenv::dotenv;
use school_backend::app::app::App;
use school_backend::util::logger::Logger;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let dotenv_result = dotenv();
    // keep the file writers alive until shutdown
    let _logger = Logger::new().map_err(|e| e.to_string())?;

    match dotenv_result {
        Ok(_) => info!("Loaded .env file"),
        Err(e) => warn!("No .env file loaded: {} (using system env vars)", e),
    }
    info!("Starting school backend");

    let app = App::new().await?;
    app.start().await
}
