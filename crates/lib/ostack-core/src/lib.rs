//! Core types and services for ostack-mcp.
//!
//! This crate owns the OpenStack authentication configuration, the lazily
//! initialized compute session, and the server-listing control plane that
//! normalizes backend results and failures into one response envelope.

pub mod compute;
pub mod config;
pub mod keystone;
pub mod session;
