pub mod scheduler;
pub mod timer;

pub use scheduler::{DispatchStep, IoGroup, Scheduler};
pub use timer::{TimerId, TimerQueue};
