pub mod clock_alerts;
pub mod controller;
pub mod store;
pub mod submission_manager;
pub mod submit_api;

pub mod models {
    pub mod log;
    pub mod roster;
    pub mod run;
    pub mod score;
    pub mod section;
    pub mod submission;
    pub mod time;
}

pub mod helpers {
    pub mod config;
    pub mod logging;
    pub mod math;
    pub mod tiles;
    pub mod time_format;
}
