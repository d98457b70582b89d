// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! berth-core: leaf domain types for the berth agent platform.
//!
//! Everything here is pure data plus small state machines: no I/O, no
//! runtime. The daemon, engine, and store crates build on these types.

pub mod macros;

pub mod approval;
pub mod clock;
pub mod completion;
pub mod fsm;
pub mod group;
pub mod message;
pub mod model;
pub mod outcome;
pub mod session;
pub mod template;

pub use approval::{Approval, ApprovalChoice, ApprovalStatus, Question, QuestionStatus};
pub use clock::{Clock, FakeClock, SystemClock};
pub use completion::{
    merge_choices, Choice, ChoiceMessage, CompletionRequest, CompletionResponse, ToolSchema, Usage,
    FINISH_TOOL_CALLS,
};
pub use fsm::{Fsm, FsmError};
pub use group::Group;
pub use message::{ChatMessage, FunctionCall, Role, ToolCall};
pub use model::{ModelRef, ModelRefError};
pub use outcome::{ExternalData, Outcome, ToolCallState, ToolCallStatus, ToolContext};
pub use session::{
    make_container_id, status_fsm, Session, SessionAction, SessionStatus, ToolSelector,
    TransitionRecord,
};
pub use template::Template;
