pub mod cookie;
pub mod durable;

pub use cookie::CookieMirror;
pub use durable::DurableStore;
