//! Application-wide runtime info.
//!
//! The information defined here are created at runtime -- as soon as the program starts -- and is intended to be shared by all tasks,
//! which should be able to read and write to it.
//!
//! Currently:
//!   * Environment info -- the process executable's file path & the worker pool
//!   * Controllers      -- the handle into the presentation thread, so tasks may start & tear down playbacks

mod runtime;
pub use runtime::*;
