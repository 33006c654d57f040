pub mod client;
pub mod gate;

pub use client::{LlmClient, LlmRequest, LlmResponse, MockLlmClient};
pub use gate::LlmGate;
