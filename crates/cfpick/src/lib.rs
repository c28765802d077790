pub mod actions;
pub mod browser;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod filter;
pub mod git;
pub mod listing;
pub mod logging;
pub mod model;
pub mod parse;
pub mod runner;
pub mod sanitize;
pub mod ui;

pub use error::{Error, Result};
