// Thin namespace wrapper for API-layer components
pub mod handlers {
    pub use crate::handlers::*;
}

pub mod ingest {
    pub use crate::ingest::*;
}

pub mod reporting {
    pub use crate::reporting::*;
}
