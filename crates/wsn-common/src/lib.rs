pub mod config;
pub mod error;
pub mod logging;
pub mod stats;
pub mod time;

pub use config::CoreConfig;
pub use error::CoreError;
pub use stats::CoreStats;
pub use time::{Clock, MonoMs};
