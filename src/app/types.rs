/// Why the runtime stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    Signal(String),
    Cancelled,
    Error(String),
}
