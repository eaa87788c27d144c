// handlers/protected/mod.rs - Session-gated handlers
//
// Every handler here runs behind session_middleware and takes a
// CurrentIdentity. Role checks go through policy::authorize with the
// route's RouteAccess. On page routes a Denial renders as a redirect to
// /dashboard; write and comment endpoints answer JSON and turn it into a 403.

pub mod ag;
pub mod comments;
pub mod hod;
pub mod landing;
pub mod officer;
pub mod settings;

pub use landing::landing;
pub use settings::settings;
