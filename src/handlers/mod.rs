//! Handler implementations

pub mod bridge;
#[cfg(feature = "console")]
pub mod console;
pub mod http;
pub mod memory;

pub use bridge::{BridgeHandler, BridgePriority, BridgedLogger, PlatformLog, StderrPlatformLog};
#[cfg(feature = "console")]
pub use console::ConsoleHandler;
#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use http::{
    HttpHandler, HttpHandlerBuilder, HttpHandlerConfig, LogPayload, Transport,
    DEFAULT_CONTENT_TYPE,
};
pub use memory::{CallbackId, LogCallback, MemoryHandler, MemoryHandlerBuilder, StoredRecord};
