//! Lobby terminal client
//!
//! Line-oriented front end for a [`lobby_client::ChatSession`]: parses what
//! the user types into [`Input`]s and renders session state as text.

#![forbid(unsafe_code)]

pub mod command;
pub mod render;

pub use command::Input;
