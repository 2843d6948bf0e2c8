use log::error;

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
            error!(target: "check_login", "failed opening the application data: {}", err);
            std::process::exit(1);
        }
    };

    if let Some(token) = std::env::args().nth(1) {
        if let Err(err) = controller.set_credentials_token(&token) {
            error!(target: "check_login", "{}", err);
            std::process::exit(1);
        }
    }

    let referee = controller.data().referee.name.clone();
    if controller.check_login().await {
        println!("logged in as {}", referee);
    } else {
        println!("login failed for {:?}", referee);
        std::process::exit(2);
    }
}
