pub mod config;
pub mod error;
pub mod handlers;
pub mod inflight;
pub mod outcome;
pub mod planner;
pub mod reconciler;
pub mod source;
pub mod sync;

#[cfg(test)]
mod test_utils;
