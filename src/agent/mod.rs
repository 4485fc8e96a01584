//! Agent module - debate participants and their conversation state

pub mod conversation;
pub mod debater;

pub use conversation::Conversation;
pub use debater::{build_agents, DebateAgent, DebateAgentBuilder};
