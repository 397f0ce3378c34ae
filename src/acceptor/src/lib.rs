//! Entry side of an invocation: parses the trigger message, loads the needs
//! and deals it points at and hands them to the need processor.

pub mod handler;
pub mod sources;
pub mod trigger;

pub use handler::{InvocationResponse, MessageHandler};
pub use sources::SourceLoader;
pub use trigger::Trigger;
