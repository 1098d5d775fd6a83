// === PUBLIC CONTRACT ===
// Only the contract module is meant for other crates to consume
pub mod contract;

pub use contract::{client, error, model};

// === MODULE DEFINITION ===
pub mod module;
pub use module::UsersModule;

// === INTERNAL MODULES ===
// Exposed for tests; not a stable API.
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod gateways;
#[doc(hidden)]
pub mod infra;
