pub mod check;
pub mod fetch;
pub mod setup;
pub mod ui;
pub mod upload;

pub use fetch::FetchOptions;
