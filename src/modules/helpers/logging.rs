use fern::Dispatch;

use crate::modules::helpers::config::Settings;

fn level_filter(verbosity: &str) -> log::LevelFilter {
    match verbosity {
        "OFF" => log::LevelFilter::Off,
        "ERROR" => log::LevelFilter::Error,
        "WARN" => log::LevelFilter::Warn,
        "DEBUG" => log::LevelFilter::Debug,
        "TRACE" => log::LevelFilter::Trace,
        // default to info
        _ => log::LevelFilter::Info,
    }
}

pub fn setup_logging(settings: &Settings) -> Result<(), fern::InitError> {
    let base_config = Dispatch::new()
        .level(level_filter(&settings.logging_level))
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        });

    base_config
        .chain(std::io::stdout())
        .chain(fern::log_file(&settings.log_file)?)
        .apply()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_levels_default_to_info() {
        assert_eq!(level_filter("TRACE"), log::LevelFilter::Trace);
        assert_eq!(level_filter("OFF"), log::LevelFilter::Off);
        assert_eq!(level_filter("verbose"), log::LevelFilter::Info);
    }
}
