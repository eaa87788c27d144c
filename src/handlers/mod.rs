// handlers/mod.rs - two tiers of routes
//
// Public (no session required) → Protected (session + role router)
pub mod protected; // Session required; role checks via policy::authorize
pub mod public; // /, /health, /auth/*
