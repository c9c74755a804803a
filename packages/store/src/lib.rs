pub mod error;
pub mod models;
pub mod repo;

mod memory;
pub use memory::MemoryStore;

pub use error::{StoreError, StoreResult};
pub use models::{
    Folder, FolderRef, FolderWithCount, NewUser, Note, NoteWithFolder, Provider, Task, User,
};
pub use repo::Store;
