//! # Tasks — validation, status filtering, atomic completion toggle
//!
//! Tasks carry a required title (trimmed, at most 200 characters), an optional
//! description (trimmed, at most 1000 characters, stored absent rather than
//! empty), and a `completed` flag. The toggle flips the flag in one atomic
//! store update and reports both status labels for that invocation; the
//! "previous" label is derived from the persisted flip, so two concurrent
//! toggles each report a consistent pair even though the final state is
//! last-write-wins.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use store::Store;

use crate::error::{Error, Result};
use crate::models::{Principal, TaskInfo};

const MAX_TITLE_LEN: usize = 200;
const MAX_TASK_DESCRIPTION_LEN: usize = 1000;

/// The two user-facing status labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Active => "active",
            TaskStatus::Completed => "completed",
        }
    }

    /// Strict filter parsing: anything but the two labels is rejected.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "active" => Ok(TaskStatus::Active),
            "completed" => Ok(TaskStatus::Completed),
            _ => Err(Error::InvalidStatusFilter),
        }
    }
}

impl From<bool> for TaskStatus {
    fn from(completed: bool) -> Self {
        if completed {
            TaskStatus::Completed
        } else {
            TaskStatus::Active
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a toggle: the persisted task plus both status labels for this
/// invocation.
#[derive(Debug, Clone, Serialize)]
pub struct TaskToggle {
    pub task: TaskInfo,
    pub previous_status: TaskStatus,
    pub new_status: TaskStatus,
}

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn Store>,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The caller's tasks: incomplete first, newest-created first within each
    /// group; `status` filters to exactly "active" or "completed".
    pub async fn list(&self, principal: &Principal, status: Option<&str>) -> Result<Vec<TaskInfo>> {
        let completed = status
            .map(TaskStatus::parse)
            .transpose()?
            .map(|s| s == TaskStatus::Completed);
        let tasks = self.store.list_tasks(principal.user_id, completed).await?;
        Ok(tasks.iter().map(TaskInfo::from).collect())
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> Result<TaskInfo> {
        let task = self
            .store
            .task_by_id(principal.user_id, id)
            .await?
            .ok_or(Error::TaskNotFound)?;
        Ok(TaskInfo::from(&task))
    }

    pub async fn create(
        &self,
        principal: &Principal,
        title: &str,
        description: Option<&str>,
    ) -> Result<TaskInfo> {
        let title = validate_title(title)?;
        let description = validate_description(description)?;
        let task = self
            .store
            .create_task(principal.user_id, title, description)
            .await?;
        Ok(TaskInfo::from(&task))
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        title: &str,
        description: Option<&str>,
    ) -> Result<TaskInfo> {
        let title = validate_title(title)?;
        let description = validate_description(description)?;
        let task = self
            .store
            .update_task(principal.user_id, id, title, description)
            .await?
            .ok_or(Error::TaskNotFound)?;
        Ok(TaskInfo::from(&task))
    }

    /// Flip the task's completion state and report both labels.
    pub async fn toggle(&self, principal: &Principal, id: Uuid) -> Result<TaskToggle> {
        let task = self
            .store
            .toggle_task(principal.user_id, id)
            .await?
            .ok_or(Error::TaskNotFound)?;
        let new_status = TaskStatus::from(task.completed);
        let previous_status = TaskStatus::from(!task.completed);
        Ok(TaskToggle {
            task: TaskInfo::from(&task),
            previous_status,
            new_status,
        })
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<()> {
        if !self.store.delete_task(principal.user_id, id).await? {
            return Err(Error::TaskNotFound);
        }
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<&str> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::TaskTitleRequired);
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(Error::TaskTitleTooLong);
    }
    Ok(title)
}

fn validate_description(description: Option<&str>) -> Result<Option<&str>> {
    match description.map(str::trim) {
        None | Some("") => Ok(None),
        Some(description) => {
            if description.chars().count() > MAX_TASK_DESCRIPTION_LEN {
                return Err(Error::TaskDescriptionTooLong);
            }
            Ok(Some(description))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{MemoryStore, NewUser};

    async fn setup() -> (Arc<MemoryStore>, TaskService, Principal) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user(NewUser {
                email: "a@x.com".to_string(),
                name: "A".to_string(),
                ..NewUser::default()
            })
            .await
            .unwrap();
        let service = TaskService::new(store.clone());
        let principal = Principal {
            user_id: user.id,
            email: user.email,
            name: user.name,
        };
        (store, service, principal)
    }

    #[tokio::test]
    async fn test_title_validations() {
        let (_, service, principal) = setup().await;

        assert!(matches!(
            service.create(&principal, "  ", None).await,
            Err(Error::TaskTitleRequired)
        ));
        // 201 characters: rejected, no row created.
        assert!(matches!(
            service.create(&principal, &"x".repeat(201), None).await,
            Err(Error::TaskTitleTooLong)
        ));
        assert!(service.list(&principal, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_description_stored_absent_when_blank() {
        let (_, service, principal) = setup().await;

        let bare = service.create(&principal, "Task", None).await.unwrap();
        assert_eq!(bare.description, None);

        let blank = service.create(&principal, "Task 2", Some("  ")).await.unwrap();
        assert_eq!(blank.description, None);

        let described = service
            .create(&principal, "Task 3", Some("  details  "))
            .await
            .unwrap();
        assert_eq!(described.description.as_deref(), Some("details"));

        assert!(matches!(
            service
                .create(&principal, "Task 4", Some(&"d".repeat(1001)))
                .await,
            Err(Error::TaskDescriptionTooLong)
        ));
    }

    #[tokio::test]
    async fn test_toggle_reports_labels_and_round_trips() {
        let (_, service, principal) = setup().await;
        let task = service.create(&principal, "Ship it", None).await.unwrap();
        let id: Uuid = task.id.parse().unwrap();
        assert!(!task.completed);

        let first = service.toggle(&principal, id).await.unwrap();
        assert_eq!(first.previous_status, TaskStatus::Active);
        assert_eq!(first.new_status, TaskStatus::Completed);
        assert!(first.task.completed);

        let second = service.toggle(&principal, id).await.unwrap();
        assert_eq!(second.previous_status, TaskStatus::Completed);
        assert_eq!(second.new_status, TaskStatus::Active);
        // Two toggles land back on the initial state.
        assert!(!second.task.completed);
    }

    #[tokio::test]
    async fn test_list_filter_is_strict() {
        let (_, service, principal) = setup().await;
        let task = service.create(&principal, "One", None).await.unwrap();
        let id: Uuid = task.id.parse().unwrap();
        service.toggle(&principal, id).await.unwrap();
        service.create(&principal, "Two", None).await.unwrap();

        assert_eq!(service.list(&principal, Some("active")).await.unwrap().len(), 1);
        assert_eq!(
            service
                .list(&principal, Some("completed"))
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(matches!(
            service.list(&principal, Some("done")).await,
            Err(Error::InvalidStatusFilter)
        ));
    }

    #[tokio::test]
    async fn test_tasks_are_owner_scoped() {
        let (store, service, principal) = setup().await;
        let task = service.create(&principal, "Mine", None).await.unwrap();
        let id: Uuid = task.id.parse().unwrap();

        let stranger = store
            .create_user(NewUser {
                email: "b@x.com".to_string(),
                name: "B".to_string(),
                ..NewUser::default()
            })
            .await
            .unwrap();
        let other = Principal {
            user_id: stranger.id,
            email: stranger.email,
            name: stranger.name,
        };

        assert!(matches!(
            service.get(&other, id).await,
            Err(Error::TaskNotFound)
        ));
        assert!(matches!(
            service.toggle(&other, id).await,
            Err(Error::TaskNotFound)
        ));
        assert!(matches!(
            service.delete(&other, id).await,
            Err(Error::TaskNotFound)
        ));
        assert!(service.get(&principal, id).await.is_ok());
    }
}
