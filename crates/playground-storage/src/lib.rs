// Session persistence and the in-memory registry layered on top of it.

pub mod registry;
pub mod session_store;

pub use registry::SessionRegistry;
pub use session_store::SessionStore;
