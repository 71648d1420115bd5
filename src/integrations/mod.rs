//! External service integrations.

pub mod ai_client {
    pub use crate::ai_client::*;
}

pub mod completion_cache {
    pub use crate::completion_cache::*;
}

pub mod circuit_breaker {
    pub use crate::circuit_breaker::*;
}
