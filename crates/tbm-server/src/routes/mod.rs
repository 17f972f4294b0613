pub mod actuators;
pub mod catalog;
pub mod config;
pub mod events;
pub mod fault;
pub mod interlocks;
pub mod state;
