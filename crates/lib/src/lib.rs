//! Learner core library — conversation, document extraction, LLM gateway, shortcuts and the
//! session controller shared by the CLI and desktop applications.

pub mod config;
pub mod conversation;
pub mod document;
pub mod llm;
pub mod session;
pub mod shortcuts;
