//! Conversation runtime for the advisory client: turns stream records into
//! assistant messages and keeps the observable conversation state.

pub mod ids;
pub mod interpreter;
pub mod message;
pub mod profile;
pub mod reconciler;
pub mod state;
pub mod store;
pub mod view;

pub use ids::{MessageId, SessionId};
pub use interpreter::{StreamSignal, interpret};
pub use message::{
    CONNECTIVITY_ERROR_REPLY, Content, ContentPart, DEFAULT_TOOL_NAME, Message, Role,
    SERVER_ERROR_REPLY, ToolCallPart,
};
pub use profile::{IntentProfile, ProfileHandle, SignalObservation};
pub use reconciler::{Reconciled, TurnReconciler};
pub use state::ConversationState;
pub use store::{AtomicTurnCounter, ConversationStore, TurnCounter, TurnOutcome};
pub use view::{MessageView, PartView, to_view};
