use log::{error, info};

use rescue_line_scoring::modules::controller::RefereeController;
use rescue_line_scoring::modules::helpers::config::Settings;
use rescue_line_scoring::modules::helpers::logging::setup_logging;

#[tokio::main]
async fn main() {
    let settings = Settings::from_env();
    if let Err(err) = setup_logging(&settings) {
        eprintln!("failed to set up logging: {}", err);
    }

    let mut controller = match RefereeController::from_settings(settings) {
        Ok(controller) => controller,
        Err(err) => {
            error!(target: "retry_failed_runs", "failed opening the run history: {}", err);
            std::process::exit(1);
        }
    };

    // credentials passed as base64 `name:password` replace the stored ones
    if let Some(token) = std::env::args().nth(1) {
        if let Err(err) = controller.set_credentials_token(&token) {
            error!(target: "retry_failed_runs", "{}", err);
            std::process::exit(1);
        }
    }

    match controller.retry_all_failed().await {
        Ok(report) => {
            info!(target: "retry_failed_runs", "{:?}", report);
            println!(
                "retried {} runs: {} successful, {} failed",
                report.attempted, report.successful, report.failed
            );
        }
        Err(err) => {
            error!(target: "retry_failed_runs", "retry failed: {}", err);
            std::process::exit(1);
        }
    }
}
