//! # Flight Assistant
//!
//! A conversational flight search assistant backed by a hosted agent service.
//!
//! This library provides:
//! - A `search_flights` tool backed by the SerpAPI Google Flights engine
//! - A capability table that describes tools to the hosted agent
//! - A session that drives hosted runs and answers their tool calls
//! - A line-oriented chat loop with best-effort cleanup of server resources
//!
//! ## Architecture
//!
//! The hosted service owns the model and the conversation thread:
//! 1. Register an agent definition with instructions and tool schemas
//! 2. Post each operator line to the thread and start a run
//! 3. Execute any tool calls the run requires and submit their output
//! 4. Print the reply; on exit delete the thread and the agent
//!
//! ## Example
//!
//! ```rust,ignore
//! use flight_assistant::{agent::Session, config::Config};
//!
//! let config = Config::from_env()?;
//! let mut session = Session::start(backend, tools, settings).await?;
//! let reply = session.respond("One way from LAX to JFK on 2026-03-10").await?;
//! session.close().await;
//! ```

pub mod agent;
pub mod config;
pub mod credential;
pub mod hosted;
pub mod llm;
pub mod logging;
pub mod repl;
pub mod tools;

pub use config::Config;
