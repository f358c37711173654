//! HTTP handlers for the role-request API.

pub mod concepts;
pub mod identities;
pub mod role_requests;
pub mod roles;
