//! External service integrations.

pub mod cep_client {
    pub use crate::cep_client::*;
}

pub mod submission_client {
    pub use crate::submission_client::*;
}
