//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence concerns so route
//! handlers can stay focused on request parsing, session plumbing and error
//! translation. Organization-scoped services take the caller's
//! [`organization::Membership`] as an explicit argument.

pub mod account;
pub mod grant;
pub mod members;
pub mod organization;
pub mod password_reset;
pub mod session;
