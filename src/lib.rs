pub mod config;
pub mod error;
pub mod game;

pub use error::{Error, Result};
