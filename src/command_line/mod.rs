//! Command-line parsing.
//!
//! Options given here take precedence over the ones in the config file -- the contract is fulfilled by
//! [crate::config::merge_configs()], called by [merge_config_file_and_command_line_options()].

mod command_line;
pub use command_line::*;
