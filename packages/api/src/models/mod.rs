//! Client-safe projections of the domain records.
//!
//! The full persistence-side records live in the `store` crate; the types here
//! are what crosses the transport boundary. They omit the password hash,
//! stringify ids, and embed exactly the related fields read paths return.

mod resources;
mod user;

pub use resources::{FolderInfo, FolderSummary, NoteFolder, NoteInfo, TaskInfo};
pub use user::{Principal, UserInfo};
