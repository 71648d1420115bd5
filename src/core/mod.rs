// Domain-layer modules and shared errors/models
pub mod rules {
    pub use crate::rules::*;
}

pub mod intent {
    pub use crate::intent::*;
}

pub mod scoring {
    pub use crate::scoring::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
