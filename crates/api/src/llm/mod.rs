//! LLM integration: the chat-completions client and the runtime-mutable
//! settings it is driven by.

pub mod client;
pub mod settings;
