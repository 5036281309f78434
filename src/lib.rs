pub mod client;
pub mod config;
pub mod error;
pub mod hooks;
pub mod session;
pub mod signal;
pub mod storage;
pub mod utils;

// Re-exports for convenient access
pub use client::{ApiClient, ApiResponse, RequestOptions};
pub use config::{ClientConfig, Realm};
pub use error::{Error, Result};
pub use hooks::{CartSync, DeactivationNotice, HookError, LogoutConfirm};
pub use session::{
    spawn_logout_watcher, Identity, LogoutReason, SessionBuilder, SessionContext, SessionEvent,
};
pub use signal::{InProcessChannel, LogoutSignal, SignalChannel};

// Crate version exposed for runtime queries
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
