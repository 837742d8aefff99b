//! Application-wide configuration.
//!
//! The contents of [config::Config] are meant to be shared between [crate::frontend] and all business logic components.\
//! This module is able to load & save configuration values from/to a given file -- see it's usage in `main.rs`.\
//! ... and there is a contract with [crate::command_line], assuring flags specified there have a higher priority over the ones
//! specified on the configuration file -- see [config_ops::merge_configs()].

mod config;
pub use config::*;

mod config_ops;
pub use config_ops::*;

mod config_impls;
