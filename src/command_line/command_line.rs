//! See [super]

use crate::{
    APP_NAME, DEBUG,
    config::*,
};
use structopt::StructOpt;


pub fn parse_from_args() -> CommandLineOptions {
    CommandLineOptions::from_args()
}

/// merges the higher priority command line options with the application-wide config (which, most probably, came from parsing the configuration file),
/// returning a new, merged, application-wide config
pub fn merge_config_file_and_command_line_options(app_config_from_file: Config, command_line_options: CommandLineOptions) -> Config {
    if DEBUG {
        println!("'{}' Command Line options: {:#?}", APP_NAME, command_line_options);
        println!("'{}' Config file options: {:#?}", APP_NAME, app_config_from_file);
    }
    let app_config_from_command_line = config_from_command_line_options(command_line_options);
    let effective_config = merge_configs(app_config_from_file, app_config_from_command_line);
    if DEBUG {
        println!("'{}' Effective config: {:#?}", APP_NAME, effective_config);
    }
    effective_config
}

/// Command-line options
#[derive(Debug,StructOpt)]
#[structopt(about = "
================================================================
Preloads sequences of Lottie animation packages -- manifests,
definitions & images -- in parallel, then plays them one after
the other. Default & advanced options are in ${0}.config.ron.
Some of them may be overridden by the command-line options bellow:
================================================================
")]
pub struct CommandLineOptions {

    /// Suppresses all output to stdout and stderr
    #[structopt(long)]
    quiet: bool,

    /// Sends all logs to the given file
    #[structopt(long)]
    log_to_file: Option<String>,

    /// Which UI to use to run the application
    #[structopt(subcommand)]
    pub runner: UiOptions,
}

/// Creates the application-wide `Config` out of the command-line options
/// -- even if the config is incomplete.
fn config_from_command_line_options(command_line_options: CommandLineOptions) -> Config {
    Config {
        log: if let Some(file_path) = command_line_options.log_to_file {
                 LoggingOptions::ToFile {
                     file_path,
                     rotation_size:    0,
                     rotations_kept:   0,
                     compress_rotated: false,
                 }
             } else if command_line_options.quiet {
                 LoggingOptions::Quiet
             } else {
                 LoggingOptions::ToConsole
             },
        tokio_threads: -1,
        player:        ExtendedOption::Unset,
        ui:            ExtendedOption::Enabled(command_line_options.runner),
    }
}


#[cfg(any(test, feature = "dox"))]
mod tests {
    use super::*;
    use crate::player::PlayMode;
    use std::path::PathBuf;

    #[cfg_attr(not(feature = "dox"), test)]
    fn play_sub_command() {
        let options = CommandLineOptions::from_iter_safe(["lottie_preloader", "--quiet", "console", "play", "--mode", "cached-decoded", "a", "b", "a"])
            .expect("valid command line");
        let config = config_from_command_line_options(options);
        assert_eq!(config.log, LoggingOptions::Quiet);
        assert_eq!(config.ui, ExtendedOption::Enabled(UiOptions::Console(Jobs::Play {
            mode:       Some(PlayMode::CachedDecoded),
            time_scale: None,
            paths:      vec![PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("a")],
        })));
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn play_requires_paths_and_known_modes() {
        assert!(CommandLineOptions::from_iter_safe(["lottie_preloader", "console", "play"]).is_err());
        assert!(CommandLineOptions::from_iter_safe(["lottie_preloader", "console", "play", "--mode", "turbo", "a"]).is_err());
    }
}
