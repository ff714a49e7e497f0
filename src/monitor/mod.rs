pub mod commands;
pub mod controller;
pub mod loop_worker;
pub mod state;

pub use controller::MonitorController;
pub use state::{AlertState, MonitorStatus};
