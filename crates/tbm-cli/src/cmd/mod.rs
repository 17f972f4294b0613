pub mod catalog;
pub mod config;
pub mod eval;
pub mod serve;
pub mod simulate;
