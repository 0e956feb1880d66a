pub mod cli;
pub mod config;
pub mod error;
pub mod github;
pub mod report;
pub mod scanner;

#[cfg(test)]
mod test_utils;

pub use config::Config;
pub use scanner::{Audience, ScanConfig, ScanResult, Scanner};
