//! Contains general operations on configs: merging, loading & saving

use super::config::{self, *};
use std::fs;
use regex::Regex;


/// Returns the result of merging the given `low_priority` and `high_priority` configs,
/// ensuring they adhere to the config contract required by the business logic modules,
/// filling in (with defaults) any missing pieces.\
/// --> Most probably, `low_priority` comes from the config file while `high_priority`
/// comes from the command line arguments (see [crate::command_line])
pub fn merge_configs(low_priority: Config, mut high_priority: Config) -> Config {
    // shoves low_priority into any missing pieces of high_priority and returns it

    // case: file logging is partially specified in the high priority -- pieces of the low priority (or default values) fills in
    if let LoggingOptions::ToFile { rotation_size, rotations_kept, compress_rotated, .. } = &mut high_priority.log {
        if *rotation_size == 0 {
            (*rotation_size, *rotations_kept, *compress_rotated) = match low_priority.log {
                LoggingOptions::ToFile { rotation_size: l_rotation_size, rotations_kept: l_rotations_kept, compress_rotated: l_compress_rotated, .. }
                    => (l_rotation_size, l_rotations_kept, l_compress_rotated),
                _   => (1024*1024*1024, 64, true),
            };
        }
    }

    // case: tokio_threads: defaults to 0 -- considered as unset if < 0
    high_priority.tokio_threads = if high_priority.tokio_threads > 0 {
        high_priority.tokio_threads
    } else if low_priority.tokio_threads > 0 {
        low_priority.tokio_threads
    } else {
        0
    };

    // case: the player is, currently, only definable in the `low_priority` -- defaults fill in when absent there
    let mut player = match (high_priority.player, low_priority.player) {
        (ExtendedOption::Enabled(h_player), _) => h_player,
        (_, ExtendedOption::Enabled(l_player)) => l_player,
        _                                      => PlayerConfig::default(),
    };

    // case: the `play` job may override some of the player options
    if let ExtendedOption::Enabled(UiOptions::Console(Jobs::Play { mode, time_scale, .. })) = &high_priority.ui {
        if let Some(mode) = mode {
            player.mode = *mode;
        }
        if let Some(time_scale) = time_scale {
            player.time_scale = *time_scale;
        }
    }
    high_priority.player = ExtendedOption::Enabled(player);

    // case: the command line always specifies the UI... but a config without it still gets a sane one
    if !high_priority.ui.is_enabled() {
        high_priority.ui = match low_priority.ui {
            ExtendedOption::Enabled(l_ui) => ExtendedOption::Enabled(l_ui),
            _                             => ExtendedOption::Enabled(UiOptions::Console(Jobs::CheckConfig)),
        };
    }

    high_priority
}

/// loads the application-wide configuration from the given `config_file_path`
/// or create it (with default values) if it doesn't exist
pub fn load_or_create_default(config_file_path: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let result = load_from_file(config_file_path);
    match result {
        Err(err) if err.to_string().contains("No such file or directory") => {
            let default_config = Config::default();
            save_to_file(&default_config, config_file_path)?;
            Ok(default_config)
        },
        _ => result,
    }
}

/// loads the application-wide configuration from the given `config_file_path`, if possible
fn load_from_file(config_file_path: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let ron_file_contents = fs::read_to_string(config_file_path)?;
    let ron_options = ron::Options::default()
        .with_default_extension(ron_extensions());
    ron_options.from_str(&ron_file_contents)
        .map_err(|err| Box::from(format!("config_ops.rs: Error deserializing contents of file '{}' as RON: {} -- HINT: delete the config file and let it be regenerated with all the default options", config_file_path, err)))
}

/// transcription of the config model, for documentation purposes when writing the default config file
const CONFIG_MODELS_DOCS: &str = include_str!("config.rs");

/// saves the application-wide `config` to `config_file_path`,
/// including documentation from the [config] model sources
fn save_to_file(config: &Config, config_file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let data_section = ron::ser::to_string_pretty(
        &config,
        ron::ser::PrettyConfig::new()
            .depth_limit(10)
            .new_line(String::from("\n"))
            .indentor(String::from("    "))
            .separate_tuple_members(true)
            .enumerate_arrays(true)
            .extensions(ron_extensions()))
        .map_err(|err| format!("config_ops.rs: Error serializing config as RON: {}", err))?;

    // include documentation on the written file, with the Regex replacements declared there
    let mut docs_section = String::from(CONFIG_MODELS_DOCS);
    for (from, to) in config::REPLACEMENTS {
        let regex = Regex::new(from)
            .map_err(|err| format!("config_ops.rs: Error parsing docs regex '{}': {}", from, err))?;
        docs_section = regex.replace_all(&docs_section, *to).to_string();
    }

    let config_file_contents = format!("{}\n\n/*{}*/\n", data_section, docs_section);

    fs::write(config_file_path, config_file_contents)
        .map_err(|err| Box::from(format!("config_ops.rs: Error writing default RON config to file '{}': {}", config_file_path, err)))
}

/// builds & returns the RON extensions used to load and save our .ron files
fn ron_extensions() -> ron::extensions::Extensions {
    let mut extensions = ron::extensions::Extensions::empty();
    extensions.insert(ron::extensions::Extensions::IMPLICIT_SOME);
    extensions.insert(ron::extensions::Extensions::UNWRAP_NEWTYPES);
    extensions
}

/// Unit tests the [config](self) module
#[cfg(any(test, feature = "dox"))]
mod tests {
    use super::*;
    use crate::player::{PlayMode, SubPackageFailurePolicy};
    use std::path::PathBuf;

    const TEST_CONFIG_FILE: &str = "/tmp/lottie-preloader-tests.config.ron";

    #[cfg_attr(not(feature = "dox"), test)]
    fn file_load_and_save() {
        fs::remove_file(TEST_CONFIG_FILE).unwrap_or(());

        // load non existing file
        let result = load_from_file(TEST_CONFIG_FILE);
        assert!(result.is_err(), "Loading from an non existing file should have returned an error");
        let error_message = result.unwrap_err().to_string();
        assert!(error_message.contains("No such file or directory"), "Error message '{}' does not contain 'No such file or directory'", error_message);

        // save to non existing file
        save_to_file(&Config::default(), TEST_CONFIG_FILE)
            .expect("Could not save config file");

        // load the -- now existing -- file
        let loaded = load_from_file(TEST_CONFIG_FILE)
            .expect("Could not load config file just created by save. Does RON have a bug or its default saving & loading parameters needs tweaking?");
        assert_eq!(loaded, Config::default(), "Config didn't survive a save & load trip");

        // the docs section must be there
        let contents = fs::read_to_string(TEST_CONFIG_FILE).expect("Could not read back the config file");
        assert!(contents.contains("pub struct PlayerConfig"), "Config file is missing its documentation section");
        assert!(!contents.contains("pub enum Jobs"), "Config file documentation went past the cut tag");

        // check load_or_create_default() for existing file
        let _result = load_or_create_default(TEST_CONFIG_FILE)
            .expect("Could not load_or_create_default() for an existing file");

        fs::remove_file(TEST_CONFIG_FILE).unwrap_or(());

        // check load_or_create_default() for non existing file
        let _result = load_or_create_default(TEST_CONFIG_FILE)
            .expect("Could not load_or_create_default() for a non existing file");
        fs::remove_file(TEST_CONFIG_FILE).unwrap_or(());
    }

    /// assures [merge_configs()] addresses all cases
    #[cfg_attr(not(feature = "dox"), test)]
    fn merging_completeness() {

        // checks high priority is honored
        let low = Config {
            log:           LoggingOptions::Quiet,
            tokio_threads: 0,
            player:        ExtendedOption::Unset,
            ui:            ExtendedOption::Unset,
        };
        let high = Config::default();
        let expected = Config::default();
        let merged = merge_configs(low, high);
        assert_eq!(merged, expected, "'merge_configs() seem to not be covering newly added configs well: High priority config got (wrongly?) overridden by low priority");

        // checks low priority has its voice
        let low = Config::default();
        let high = Config {
            log:           LoggingOptions::ToConsole,
            tokio_threads: -1,
            player:        ExtendedOption::Unset,
            ui:            ExtendedOption::Unset,
        };
        let expected = Config::default();
        let merged = merge_configs(low, high);
        assert_eq!(merged, expected, "'merge_configs() seem to not be covering newly added configs well: Low priority config wasn't able to set unset properties in the high priority");
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn play_job_overrides_the_player() {
        let low = Config {
            player: ExtendedOption::Enabled(PlayerConfig {
                mode:                PlayMode::Cached,
                sub_package_failure: SubPackageFailurePolicy::SkipPackage,
                time_scale:          0.5,
            }),
            ..Config::default()
        };
        let high = Config {
            log:           LoggingOptions::ToFile { file_path: "/tmp/x.log".to_string(), rotation_size: 0, rotations_kept: 0, compress_rotated: false },
            tokio_threads: 4,
            player:        ExtendedOption::Unset,
            ui:            ExtendedOption::Enabled(UiOptions::Console(Jobs::Play { mode: Some(PlayMode::Origin), time_scale: None, paths: vec![PathBuf::from("a")] })),
        };
        let merged = merge_configs(low, high);
        assert_eq!(merged.tokio_threads, 4);
        assert_eq!(merged.log, LoggingOptions::ToFile { file_path: "/tmp/x.log".to_string(), rotation_size: 1024*1024*1024, rotations_kept: 64, compress_rotated: true });
        assert_eq!(merged.player.as_enabled(), Some(&PlayerConfig {
            mode:                PlayMode::Origin,
            sub_package_failure: SubPackageFailurePolicy::SkipPackage,
            time_scale:          0.5,
        }));
    }

}
