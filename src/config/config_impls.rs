//! Contains implementations (of business rules) on any models declared in `config.rs`

use super::*;
use crate::player::PlayOptions;


impl Config {

    /// the effective player config -- defaults if, somehow, it wasn't merged in
    pub fn player_config(&self) -> PlayerConfig {
        self.player.as_enabled()
            .cloned()
            .unwrap_or_default()
    }
}

impl PlayerConfig {

    /// options for [crate::player::prepare_and_play()] requests
    pub fn play_options(&self) -> PlayOptions {
        PlayOptions {
            sub_package_failure: self.sub_package_failure,
            ..PlayOptions::for_mode(self.mode)
        }
    }

    /// [Self::time_scale], constrained to sane values
    pub fn effective_time_scale(&self) -> f64 {
        if self.time_scale.is_finite() && self.time_scale > 0.0 {
            self.time_scale
        } else {
            0.0
        }
    }
}


#[cfg(any(test, feature = "dox"))]
mod tests {
    use super::*;
    use crate::player::{PlayMode, SubPackageFailurePolicy};

    #[cfg_attr(not(feature = "dox"), test)]
    fn play_options_follow_the_mode() {
        let player = PlayerConfig { mode: PlayMode::Cached, sub_package_failure: SubPackageFailurePolicy::SkipPackage, time_scale: f64::NAN };
        assert_eq!(player.play_options(), PlayOptions { pre_cache: true, pre_decode: false, sub_package_failure: SubPackageFailurePolicy::SkipPackage });
        assert_eq!(player.effective_time_scale(), 0.0);
        let config = Config { player: ExtendedOption::Disabled, ..Config::default() };
        assert_eq!(config.player_config(), PlayerConfig::default());
    }
}
