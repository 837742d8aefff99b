//! see [super]

use crate::{
    runtime::Runtime,
    config::Config,
    frontend::console::ConsolePresentation,
    player::{self, PlayMode, PlayerHandle},
};
use std::{
    path::PathBuf,
    str::FromStr,
    sync::Arc,
    time::Instant,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::RwLock,
};
use log::{info, warn};


/// Starts playing `paths` -- as a single request -- returning its handle
pub fn play_once(worker_pool: &tokio::runtime::Handle, config: &Config, paths: Vec<PathBuf>, presentation: &ConsolePresentation) -> PlayerHandle {
    play_with_mode(worker_pool, config, config.player_config().mode, paths, presentation)
}

fn play_with_mode(worker_pool: &tokio::runtime::Handle, config: &Config, mode: PlayMode, paths: Vec<PathBuf>, presentation: &ConsolePresentation) -> PlayerHandle {
    let options = crate::config::PlayerConfig { mode, ..config.player_config() }.play_options();
    let request_len = paths.len();
    let start = Instant::now();
    info!("Playing {} animation(s) in mode {}", request_len, mode.as_ref());
    player::prepare_and_play(worker_pool, paths, options, presentation, move || {
        info!("All {} animation(s) played in {:?}", request_len, start.elapsed());
    })
}

/// A line typed in the [interactive()] job
#[derive(Debug, PartialEq)]
pub enum Command {
    Play(Vec<PathBuf>),
    Mode(PlayMode),
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let command = match words.next()? {
            "play" => Command::Play(words.map(PathBuf::from).collect()),
            "mode" => match words.next().map(PlayMode::from_str) {
                Some(Ok(mode)) => Command::Mode(mode),
                _              => Command::Unknown(line.trim().to_string()),
            },
            "help" | "?"   => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => Command::Unknown(line.trim().to_string()),
        };
        Some(command)
    }
}

const HELP: &str = "commands:
    play PATH...                          -- preloads & plays the given animation roots, in order
    mode origin|cached|cached-decoded     -- how images are prepared for the next plays
    quit                                  -- stops playing & quits";

/// `true` while the last request started by [interactive()] is still playing
fn is_busy(in_flight: Option<&PlayerHandle>) -> bool {
    in_flight.map_or(false, |handle| !handle.is_disposed())
}

/// Reads [Command]s from the standard input until `quit` (or end of input), refusing to start a new playback while one is in progress
pub async fn interactive(runtime: Arc<RwLock<Runtime>>, config: Arc<Config>) {
    let worker_pool = runtime.read().await.worker_pool.clone();
    let mut in_flight: Option<PlayerHandle> = None;
    let mut mode = config.player_config().mode;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", HELP);
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!("Interactive: couldn't read the standard input: {}", err);
                break
            },
        };
        match Command::parse(&line) {
            None => continue,
            Some(Command::Play(paths)) if paths.is_empty() => println!("play what? {}", HELP),
            Some(Command::Play(paths)) => {
                if is_busy(in_flight.as_ref()) {
                    println!("busy: the previous animations are still playing");
                    continue
                }
                let handle = Runtime::do_for_presentation(&runtime, |presentation, _runtime| {
                    let handle = play_with_mode(&worker_pool, &config, mode, paths, presentation);
                    Box::pin(async move { handle })
                }).await;
                in_flight = Some(handle);
            },
            Some(Command::Mode(new_mode)) => {
                mode = new_mode;
                println!("mode: {}", mode.as_ref());
            },
            Some(Command::Help) => println!("{}", HELP),
            Some(Command::Quit) => break,
            Some(Command::Unknown(line)) => println!("unknown command '{}' -- {}", line, HELP),
        }
    }
    Runtime::do_for_presentation(&runtime, |presentation, _runtime| {
        let quit = presentation.dispatch(|stage| {
            stage.teardown();
            stage.surface_mut().request_quit();
        });
        Box::pin(async move {
            if let Err(err) = quit {
                warn!("Interactive: couldn't request the presentation thread to quit: {}", err);
            }
        })
    }).await;
}

/// Inspects & shows the effective configs & runtime used by the application
pub async fn check_config(runtime: &RwLock<Runtime>, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Effective Config:  {:#?}", config);
    let runtime = runtime.read().await;
    #[derive(Debug)]
    struct SerializableRuntime<'a> {
        executable_path:        &'a str,
        worker_threads:         usize,
        presentation_available: bool,
    }
    println!("Effective Runtime: {:#?}", SerializableRuntime {
        executable_path:        &runtime.executable_path,
        worker_threads:         runtime.worker_threads,
        presentation_available: runtime.has_presentation(),
    });
    Ok(())
}


#[cfg(any(test, feature = "dox"))]
mod tests {
    use super::*;
    use crate::{
        frontend::console::ConsoleSurface,
        player::{PresentationThread, Stage},
    };

    #[cfg_attr(not(feature = "dox"), test)]
    fn commands_are_parsed() {
        assert_eq!(Command::parse("   "), None);
        assert_eq!(Command::parse("play a b a"), Some(Command::Play(vec![PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("a")])));
        assert_eq!(Command::parse("mode cached"), Some(Command::Mode(PlayMode::Cached)));
        assert_eq!(Command::parse("mode cached-decoded"), Some(Command::Mode(PlayMode::CachedDecoded)));
        assert_eq!(Command::parse("mode fastest"), Some(Command::Unknown("mode fastest".to_string())));
        assert_eq!(Command::parse("quit"), Some(Command::Quit));
        assert_eq!(Command::parse("dance"), Some(Command::Unknown("dance".to_string())));
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn busy_until_the_request_is_over() {
        let worker_pool = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("failed to build the tokio runtime");
        let mut stage = Stage::new(ConsoleSurface::new(worker_pool.handle().clone(), 0.0));
        let (mut presentation_thread, presentation) = PresentationThread::new();
        let config = Config::default();
        assert!(!is_busy(None));

        let handle = play_with_mode(worker_pool.handle(), &config, PlayMode::Origin, vec![], &presentation);
        // nothing ran on the presentation thread yet
        assert!(is_busy(Some(&handle)));
        presentation_thread.run_until(&mut stage, |_| handle.is_disposed());
        assert!(!is_busy(Some(&handle)));
    }
}
