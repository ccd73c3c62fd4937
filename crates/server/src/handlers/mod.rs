//! HTTP request handlers.

pub mod artifacts;
pub mod health;
pub mod submissions;

pub use artifacts::*;
pub use health::*;
pub use submissions::*;
