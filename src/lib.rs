//! line-echo: a line-oriented TCP echo server
//!
//! Clients send newline-delimited text and receive one reply line per
//! message. A few words and slash commands get special replies:
//! - `hello`, `bye`
//! - `/time`, `/quit`, `/echo <text>`
//!
//! Features:
//! - One session task per connection, with an inactivity timeout
//! - Append-only activity log per client address
//! - A relay client that pipes stdin to the server
//! - Configuration via CLI arguments or TOML file

pub mod activity;
pub mod config;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod server;
pub mod session;
