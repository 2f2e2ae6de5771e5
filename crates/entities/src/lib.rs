//! Core entity definitions for BuenaVista.
//!
//! This crate defines the data types shared across the BuenaVista
//! application: users, location posts, comments, and the author snapshot
//! embedded in every post and comment.

mod author;
mod comment;
mod location;
mod user;

pub use author::*;
pub use comment::*;
pub use location::*;
pub use user::*;
