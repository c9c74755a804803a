//! Client-safe projections of folders, notes, and tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use store::{Folder, FolderWithCount, NoteWithFolder, Task};

/// A folder as returned by create/rename/get.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FolderInfo {
    pub id: String,
    pub name: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Folder> for FolderInfo {
    fn from(folder: &Folder) -> Self {
        Self {
            id: folder.id.to_string(),
            name: folder.name.clone(),
            is_default: folder.is_default,
            created_at: folder.created_at,
            updated_at: folder.updated_at,
        }
    }
}

/// A folder as returned by listings: annotated with its note count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FolderSummary {
    pub id: String,
    pub name: String,
    pub is_default: bool,
    pub note_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&FolderWithCount> for FolderSummary {
    fn from(entry: &FolderWithCount) -> Self {
        Self {
            id: entry.folder.id.to_string(),
            name: entry.folder.name.clone(),
            is_default: entry.folder.is_default,
            note_count: entry.note_count,
            created_at: entry.folder.created_at,
            updated_at: entry.folder.updated_at,
        }
    }
}

/// The owning folder embedded in note reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteFolder {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteInfo {
    pub id: String,
    pub title: String,
    pub content: String,
    pub folder: NoteFolder,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&NoteWithFolder> for NoteInfo {
    fn from(entry: &NoteWithFolder) -> Self {
        Self {
            id: entry.note.id.to_string(),
            title: entry.note.title.clone(),
            content: entry.note.content.clone(),
            folder: NoteFolder {
                id: entry.folder.id.to_string(),
                name: entry.folder.name.clone(),
            },
            created_at: entry.note.created_at,
            updated_at: entry.note.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskInfo {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Task> for TaskInfo {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.to_string(),
            title: task.title.clone(),
            description: task.description.clone(),
            completed: task.completed,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}
