//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence concerns so route
//! handlers can stay focused on protocol translation and auth plumbing.
//! Mutating services commit first and publish second: the hub never sees
//! an event for a change that did not commit.

pub mod access;
pub mod board;
pub mod card;
pub mod list;
pub mod mutation;
pub mod position;
