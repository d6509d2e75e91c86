//! Service Layer
//!
//! Business logic between the routes and the database client: the write
//! orchestrator and cached read paths for notes, and the share
//! registry. Routes stay thin; response types stay pure DTOs.

pub mod note_service;
pub mod share_service;
