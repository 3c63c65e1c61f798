//! Prompt domain
//!
//! Templates for the router model, the execution model and the follow-up
//! calls that interpret tool failures and results.

mod template;

pub use template::{PromptOverrides, PromptTemplate};
