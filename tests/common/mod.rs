//! Integration test common infrastructure.
//!
//! Provides a scripted IRC server for the bot to connect to and a wrapper
//! that runs the bot binary with a temporary config.

pub mod bot;
pub mod server;

#[allow(unused_imports)]
pub use bot::{TestBot, fixture_key};
#[allow(unused_imports)]
pub use server::{ServerConn, TestServer};
