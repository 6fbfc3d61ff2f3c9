pub mod backend;
pub mod config;
pub mod errors;
pub mod logging;
pub mod model;
pub mod presenter;
pub mod refiner_config;
pub mod session;
pub mod stage;
pub mod tasks;
pub mod tracker;
pub mod ui;
