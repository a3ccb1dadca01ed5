#![forbid(unsafe_code)]

pub mod authoring;
pub mod error;
pub mod gating;
pub mod model;
pub mod progress;
pub mod scoring;
pub mod time;

pub use error::NavigationBlocked;
pub use time::Clock;
