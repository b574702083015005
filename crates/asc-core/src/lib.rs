pub mod config;
pub mod error;
pub mod types;

pub use config::*;
pub use error::{ParseError, ScriptError, StepError};
pub use types::*;
