// handlers/public/mod.rs - Public handlers (no session required)
//
// The session layer skips /health and /auth/* entirely. The root path is
// resolved but never gated, so it can dispatch on whether a session exists.

pub mod health;
pub mod session;

pub use health::health;
pub use session::{login, logout, root};
