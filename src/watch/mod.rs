//! Watch loop over registry membership events.

pub mod watch_loop;


pub use watch_loop::{WatchError, WatchLoop, WatchState};
