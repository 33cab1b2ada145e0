//! # API Shared
//!
//! Shared utilities and definitions for the CMR API surface.
//!
//! Contains:
//! - Request/response DTOs with OpenAPI schemas (`dto` module)
//! - Viewer claim extraction from identity-provider headers (`auth`)
//! - The shared `HealthService`
//!
//! DTO fields carry roles, statuses and dates as strings on the wire;
//! handlers parse them into the closed domain enums, so no endpoint ever
//! trusts a client-declared value without validation.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{viewer_claims, ClaimsError, ViewerClaims};
pub use health::HealthService;
