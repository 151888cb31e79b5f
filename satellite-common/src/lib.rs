pub mod metrics;
pub mod pgstore;
pub mod retry;
pub mod satellite;
pub mod store;
