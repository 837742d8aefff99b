//! Keep, in this module, all the types used for the applications config file
//! -- the file will be placed along the `${0}.config.ron` config file to
//! serve as it's documentation

use crate::player::{PlayMode, SubPackageFailurePolicy};
use std::{
    ops::{Deref, DerefMut},
    path::PathBuf,
};
use serde::{Serialize, Deserialize};
use structopt::StructOpt;
use strum::VariantNames;


/// CONFIG FILE DOCUMENTATION
/// (feel free to move comments & possible values close to the data)
///
/// Root for this Application's config
#[derive(Debug,PartialEq,Serialize,Deserialize)]
pub struct Config {

    // application
    //////////////

    /// Specifies what the application should do with it's log messages
    pub log: LoggingOptions,
    /// The number of threads to dedicate to Tokio -- the worker pool where animation packages are loaded.
    /// Set it to 0 to use all available CPUs the process has access to
    pub tokio_threads: i16,

    // business logic
    /////////////////

    /// How animations are prepared & played
    pub player: ExtendedOption<PlayerConfig>,
    /// The UI that should be used to run the application
    pub ui: ExtendedOption<UiOptions>,
}

/// Player options
#[derive(Debug,PartialEq,Clone,Serialize,Deserialize)]
pub struct PlayerConfig {
    /// How images of each sub-package are prepared before playing:
    ///   - `Origin`:        nothing is read upfront -- images come from disk when the renderer asks for them;
    ///   - `Cached`:        every image is read upfront, decoding is left for the renderer;
    ///   - `CachedDecoded`: every image is read and decoded upfront, in the worker pool
    pub mode: PlayMode,
    /// What to do with the remaining sub-packages of an animation once one of them fails to load:
    ///   - `AbandonItem`: play only the sub-packages loaded before the failure;
    ///   - `SkipPackage`: play all sub-packages but the failed one
    pub sub_package_failure: SubPackageFailurePolicy,
    /// Multiplier for how long the console "renderer" takes to play each loop -- 0.0 plays instantly
    pub time_scale: f64,
}

/// UI options -- how the application will interact with users
#[derive(Debug,PartialEq,Clone,Serialize,Deserialize,StructOpt)]
pub enum UiOptions {
    /// Runs the application's headless console UI -- run `${0} console --help` for more details
    Console(Jobs),
}

/// Logging options -- what to do with log messages
#[derive(Debug,PartialEq,Serialize,Deserialize)]
pub enum LoggingOptions {
    /// Simply ignore them
    Quiet,
    /// Output them to stdout
    ToConsole,
    /// Save them to the specified file, with the specified options:
    ToFile {
        /// File to use a basis for rotation or appending
        file_path: String,
        /// The maximum size (bytes) for a log file before a rotation kicks in -- example: 1024*1024*1024 = 1073741824
        rotation_size: usize,
        /// The upper limit of rotations to keep before deleting old ones -- example: 64
        rotations_kept: usize,
        /// Performs a gzip compression after a rotation?
        compress_rotated: bool,
    },
}

/////  EVERYTHING BELOW THIS LINE WILL NOT BE INCLUDED IN THE APPLICATION'S CONFIG FILE  /////

/// Jobs that this application supports, each one a sub-command of the console UI
#[derive(Debug,PartialEq,Clone,Serialize,Deserialize,StructOpt)]
pub enum Jobs {
    /// Preloads the given animation roots (directories holding a `package.json`) and plays them in order,
    /// quitting when the last one is over. Repeated roots are loaded once and looped
    Play {
        /// Overrides the config file's `player.mode`
        #[structopt(long, possible_values = PlayMode::VARIANTS)]
        mode: Option<PlayMode>,
        /// Overrides the config file's `player.time_scale`
        #[structopt(long)]
        time_scale: Option<f64>,
        /// Animation roots to play, in order
        #[structopt(parse(from_os_str), required = true)]
        paths: Vec<PathBuf>,
    },
    /// Reads `play`, `mode` & `quit` commands from the standard input, one per line
    Interactive,
    /// Inspects & shows the effective configs & runtime used by the application, then quits
    CheckConfig,
}

/// A simple extension to the default `Option` to allow distinction for the None state (is it unset or forcibly disabled?)
#[derive(Debug,PartialEq,Clone,Serialize,Deserialize)]
pub enum ExtendedOption<T> {
    Unset,
    Disabled,
    Enabled(T),
}
impl<T> ExtendedOption<T> {
    pub fn is_enabled(&self) -> bool {
        matches!(self, ExtendedOption::Enabled(_))
    }
    pub fn as_enabled(&self) -> Option<&T> {
        match self {
            ExtendedOption::Enabled(raw) => Some(raw),
            _                            => None,
        }
    }
}
impl<T> Deref for ExtendedOption<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        match self {
            ExtendedOption::Enabled(raw) => raw,
            ExtendedOption::Unset        => panic!("BUG! attempted to `deref` the (non-existing) raw value -- from an 'Unset' variant of 'ExtendedOption'"),
            ExtendedOption::Disabled     => panic!("BUG! attempted to `deref` the (non-existing) raw value -- from an 'Disabled' variant of 'ExtendedOption'"),
        }
    }
}
impl<T> DerefMut for ExtendedOption<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            ExtendedOption::Enabled(raw) => raw,
            ExtendedOption::Unset        => panic!("BUG! attempted to `deref_mut` the (non-existing) raw value -- from an 'Unset' variant of 'ExtendedOption'"),
            ExtendedOption::Disabled     => panic!("BUG! attempted to `deref_mut` the (non-existing) raw value -- from an 'Disabled' variant of 'ExtendedOption'"),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            mode:                PlayMode::CachedDecoded,
            sub_package_failure: SubPackageFailurePolicy::AbandonItem,
            time_scale:          1.0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log:           LoggingOptions::ToConsole,
            tokio_threads: 0,
            player:        ExtendedOption::Enabled(PlayerConfig::default()),
            ui:            ExtendedOption::Enabled(UiOptions::Console(Jobs::CheckConfig)),
        }
    }
}

/// Regexes and their replacements to apply to this file when writing the docs
pub const REPLACEMENTS: &[(&str, &str)] = &[
    ("\n//![^\n]*",                                                                                            ""),     // remove file doc comments
    ("\nuse [^;]*;",                                                                                           ""),     // remove 'use' clauses
    ("\n#[^\n]*",                                                                                              ""),     // remove macros & #[derive(...)] clauses
    ("(?s)\n/////  EVERYTHING BELOW THIS LINE WILL NOT BE INCLUDED IN THE APPLICATION'S CONFIG FILE  /////.*", ""),     // remove everything after the comment tag
    ("\n\n+",                                                                                                  "\n\n"), // standardize the number of consecutive empty lines
];
