//! Tool domain module
//!
//! Tools are the operations a tool server exposes. The server lists them
//! (`GetTools`) as [`ToolDescriptor`]s; the execution model asks for one via a
//! [`ToolInvocation`]; the server answers with a [`ToolOutput`] (`RunTool`).
//!
//! ```text
//! ┌────────────────┐    ┌────────────────┐    ┌──────────────┐
//! │ ToolDescriptor │───▶│ ToolInvocation │───▶│ ToolOutput   │
//! │ (tools/list)   │    │ (model call)   │    │ (tools/call) │
//! └────────────────┘    └────────────────┘    └──────────────┘
//! ```

pub mod entities;
pub mod value_objects;

pub use entities::{ToolDescriptor, ToolInvocation};
pub use value_objects::{ToolOutput, ToolPayload};
