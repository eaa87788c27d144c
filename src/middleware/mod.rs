pub mod cookies;
pub mod response;
pub mod session;

pub use response::ApiResponse;
pub use session::{session_middleware, Credentials, CurrentIdentity, SessionResolver, SessionState};
