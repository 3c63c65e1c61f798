//! OpenAI chat completions adapter

mod gateway;
pub mod types;

pub use gateway::{DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, OpenAiGateway, OpenAiSettings};
