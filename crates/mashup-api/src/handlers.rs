//! Request handlers.

pub mod health;
pub mod mashups;
pub mod page;

pub use health::*;
pub use mashups::*;
pub use page::*;
