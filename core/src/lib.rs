pub mod action;
pub mod config;
pub mod interactive;
pub mod str_interp;
pub mod style;
pub mod submission;
pub mod testing;

pub use crate::config::Config;
