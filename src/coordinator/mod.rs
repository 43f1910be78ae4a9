mod builder;
mod listener;
mod poller;
mod stats;

pub use builder::PollingCoordinatorBuilder;
pub use listener::{FnListener, SnapshotListener};
pub use poller::PollingCoordinator;
pub use stats::CoordinatorStats;
