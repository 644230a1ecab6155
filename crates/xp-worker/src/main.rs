//! XP worker entry point
//!
//! Run with:
//! ```bash
//! cargo run -p xp-worker
//! ```
//!
//! Configuration is loaded from environment variables; leveling settings
//! come from the file named by `LEVELING_CONFIG`.

use tracing::{error, info};
use xp_common::{try_init_tracing, try_init_tracing_with_config, AppConfig, AppError, TracingConfig};
use xp_worker::Runtime;

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            if let Err(e) = try_init_tracing() {
                eprintln!("Warning: Failed to initialize tracing: {e}");
            }
            let e = AppError::from(e);
            error!(error = %e, code = e.error_code(), "Failed to load configuration");
            std::process::exit(e.exit_code());
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(error = %e, code = e.error_code(), "Worker failed");
        std::process::exit(e.exit_code());
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    info!(
        name = %config.app.name,
        env = ?config.app.env,
        settings = %config.worker.settings_path.display(),
        "Starting XP worker..."
    );

    let runtime = Runtime::build(&config).await?;

    // Without a platform adapter the guild cache stays empty; sweeping against
    // it would end every stored session
    info!("Voice sweeper waits for a platform adapter to mark the guild cache ready");

    runtime
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await
}
