//! The application's jobs, on top of the [crate::player]:
//!   - [play_once()]: plays a single request, given on the command line;
//!   - [interactive()]: plays requests read from the standard input -- one at a time;
//!   - [check_config()]: shows what the application would run with.

mod logic;
pub use logic::*;
