mod api;
mod handlers;
#[cfg(test)]
mod tests;

pub use api::{router, ApiServer, ApiServerBuilder, ServerState};
pub use handlers::CommandParams;
