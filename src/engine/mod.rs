/// Conversational recommendation engine
///
/// Turns a free-text user message into a ranked, deduplicated list of titles,
/// tracking per-session history so consecutive turns stay varied. The
/// orchestrator sequences the parts; everything else here is a pure or
/// provider-backed building block.
pub mod ambiguity;
pub mod cultural;
pub mod diversity;
pub mod fallback;
pub mod history;
pub mod intent;
pub mod orchestrator;
pub mod query;
pub mod reference;

pub use orchestrator::{Conversation, ConversationStats, EngineMessage, EngineResponse};
