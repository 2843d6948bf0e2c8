use std::fs;

use log::{error, info};

use rescue_line_scoring::modules::controller::RefereeController;
use rescue_line_scoring::modules::helpers::config::Settings;
use rescue_line_scoring::modules::helpers::logging::setup_logging;

const DEFAULT_EXPORT_FILE: &str = "runHistory-scores.json";

fn main() {
    let settings = Settings::from_env();
    if let Err(err) = setup_logging(&settings) {
        eprintln!("failed to set up logging: {}", err);
    }

    let controller = match RefereeController::from_settings(settings) {
        Ok(controller) => controller,
        Err(err) => {
            error!(target: "export_scores", "failed opening the run history: {}", err);
            std::process::exit(1);
        }
    };

    let scores = controller.score_export();
    let json = match serde_json::to_string_pretty(&scores) {
        Ok(json) => json,
        Err(err) => {
            error!(target: "export_scores", "failed serializing scores: {}", err);
            std::process::exit(1);
        }
    };

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_EXPORT_FILE.to_string());
    if let Err(err) = fs::write(&path, json) {
        error!(target: "export_scores", "failed writing {}: {}", path, err);
        std::process::exit(1);
    }
    info!(target: "export_scores", "exported {} runs to {}", scores.len(), path);
}
