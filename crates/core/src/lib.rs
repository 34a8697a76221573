//! `shipdesk-core`: identifiers, errors and value-object conventions shared
//! by the shipping domain crates.
//!
//! Nothing here touches storage or the network.

pub mod error;
pub mod id;
pub mod value_object;

pub use error::{DomainError, DomainResult};
pub use id::CustomerId;
pub use value_object::ValueObject;
