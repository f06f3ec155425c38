pub mod cli;
pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
pub mod logging;
pub mod secrets;
pub mod steps;

pub use error::StepError;
