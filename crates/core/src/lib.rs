//! # SlidePilot Core
//!
//! Domain types, traits, and error definitions for the SlidePilot agent.
//! This crate defines the contracts; the provider, the slide tools, the audit
//! log, and the agent loop all live in their own crates and depend inward on
//! this one.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`Provider`] for model inference
//! - [`DocumentBackend`] for per-operation document mutation
//! - [`Renderer`] for slide-to-image export
//!
//! This keeps the agent loop testable with scripted stand-ins.

pub mod backend;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod session;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use backend::{DocumentBackend, Renderer};
pub use error::{Error, ProviderError, Result, ToolError};
pub use event::{EventBus, LiveEvent};
pub use message::{Conversation, ConversationId, Role, Turn};
pub use provider::{ContentItem, Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use session::DocumentSession;
pub use tool::{Tool, ToolCall, ToolDescriptor, ToolRegistry, ToolResult};
