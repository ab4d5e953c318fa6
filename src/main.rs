use tracing::{error, info};

use chatrelay::{Config, RelayServer, ServerContext};

#[tokio::main]
async fn main() {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    // Load configuration
    let mut config = match Config::load(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {path}: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    // Initialize logging
    if let Err(e) = chatrelay::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        chatrelay::logging::init_console_only(&config.logging.level);
    }

    info!("chatrelay - multi-room chat relay");

    let server = match RelayServer::bind(&config.server).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to bind {}: {}", config.bind_addr(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run_until_ctrl_c(ServerContext::new()).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Server stopped");
}
