//! Database initialization and repository queries
//!
//! Every query that touches a book takes the owning user id, so a row
//! belonging to another user is indistinguishable from a missing one.

pub mod bookmarks;
pub mod books;
pub mod init;
pub mod quotes;
pub mod users;

pub use init::*;
