//! The agent loop for SlidePilot.
//!
//! One user message drives a cycle of rounds:
//!
//! 1. **Send** the whole conversation and the tool catalogue to the model
//! 2. **Record** the assistant turn and surface its text
//! 3. **Execute** each requested tool in order and append the results
//! 4. **Stop** when a response requests no tools
//!
//! [`ChatSession`] wraps the loop with the document session and context
//! enrichment used by front ends.

pub mod chat;
pub mod executor;
pub mod loop_runner;

#[cfg(test)]
mod test_helpers;

pub use chat::ChatSession;
pub use executor::Executor;
pub use loop_runner::{AgentLoop, LoopOutcome};
