//! Router Module Index
//!
//! Routes are split by the area they live in. Access to each area is decided by
//! `access::access_middleware`, which wraps the whole router; handlers in the
//! vendor and admin areas re-check the role they need.

/// Routes open to everyone: health check and the product catalog.
pub mod public;

/// Routes under `/vendedores`, reachable by vendors and admins.
pub mod vendor;

/// Routes under `/admin`, reachable by admins only.
pub mod admin;
