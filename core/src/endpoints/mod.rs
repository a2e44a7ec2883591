//! Model endpoint implementations.

pub mod factory;
pub mod openai;

pub use factory::create_endpoint;
pub use openai::OpenAiEndpoint;
