//! Payer gateways
//!
//! One transport client per external payer API plus the profile builders and
//! the registry that routes an order's payer to its gateway.

mod availity;
mod optum;
mod profiles;
mod registry;

pub use availity::AvailityGateway;
pub use optum::OptumGateway;
pub use profiles::{availity_profile, optum_profile};
pub use registry::PayerRegistry;
