// Core data model and pure logic for the playground orchestrator.
// No I/O lives here; everything is unit-testable without a runtime.

pub mod api;
pub mod duration;
pub mod ids;
pub mod session;
pub mod sse;

pub use api::{
    AckResponse, AgentInfo, AgentListResponse, CreateSessionRequest, InvokeRequest,
    InvokeResponse, SessionListResponse,
};
pub use duration::{parse_duration_ms, DEFAULT_SESSION_TIMEOUT_MS};
pub use session::{AgentEvent, Message, MessageRole, Session, SessionSummary};
pub use sse::{FrameBuffer, RelayFrame, DONE_SENTINEL};
