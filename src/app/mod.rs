mod runtime;
mod signals;
mod types;

#[cfg(test)]
mod tests;

pub use runtime::MonitorRuntime;
pub use signals::wait_for_shutdown_signal;
pub use types::ShutdownReason;
