//! Agent module - conversations with the hosted flight assistant.
//!
//! The hosted service runs the model; this side follows the run protocol:
//! 1. Register the agent definition with instructions and tool schemas
//! 2. Post the operator's message to the thread and start a run
//! 3. While the run requires action, execute the requested tools and submit outputs
//! 4. Read the assistant's reply once the run completes

mod agent_loop;
mod prompt;

pub use agent_loop::{Session, SessionError, SessionSettings, AGENT_NAME};
pub use prompt::build_instructions;
