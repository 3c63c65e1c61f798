//! Application-level configuration.
//!
//! - [`RoutingParams`]: models and limits used by the request use cases

pub mod routing_params;

pub use routing_params::RoutingParams;
