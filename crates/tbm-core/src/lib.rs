pub mod catalog;
pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod interlock;
pub mod io;
pub mod machine;
pub mod paths;
pub mod safety;
pub mod severity;
pub mod telemetry;
pub mod threshold;
pub mod types;

pub use error::{Result, TbmError};
