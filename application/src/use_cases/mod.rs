//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod execute_tool;
pub mod handle_request;
pub mod route_request;

#[cfg(test)]
pub(crate) mod test_support;
