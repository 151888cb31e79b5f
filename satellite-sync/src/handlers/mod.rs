mod app;
mod satellite;

pub use app::{app, AppState};
pub use satellite::{FetchParams, DEFAULT_FETCH_SIZE};
