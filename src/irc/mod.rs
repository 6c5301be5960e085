//! IRC Transport
//!
//! Protocol lines, outgoing pacing and the connection session.

pub mod client;
pub mod message;
pub mod outgoing;

pub use client::IrcBot;
pub use outgoing::FloodControl;
