use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Code of the list synthesized for empty and legacy-format stores.
pub const DEFAULT_LIST_CODE: &str = "default";

/// Generated task ids are this many hex characters.
const TASK_ID_LEN: usize = 8;

/// A single task within a list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub text: String,
    pub done: bool,
    /// Username of the author.
    pub user: String,
}

/// A shared task list, keyed by its join code in [`Snapshot::lists`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskList {
    pub name: String,
    /// Advisory: may reference a deleted account.
    pub owner: Option<String>,
    pub members: Vec<String>,
    /// Insertion order is display order.
    pub tasks: Vec<Task>,
}

/// Outcome of [`Snapshot::mark_done`] on an existing task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkDone {
    Marked,
    AlreadyDone,
}

/// The complete in-memory state: all accounts and all lists.
///
/// `BTreeMap` keys give deterministic serialization, so saving a freshly
/// loaded snapshot reproduces the same bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    pub users: BTreeMap<String, String>,
    pub lists: BTreeMap<String, TaskList>,
}

impl Snapshot {
    /// A fresh store: no accounts, one ownerless list named "default".
    pub fn empty() -> Self {
        let mut lists = BTreeMap::new();
        lists.insert(
            DEFAULT_LIST_CODE.to_string(),
            TaskList {
                name: DEFAULT_LIST_CODE.to_string(),
                owner: None,
                members: Vec::new(),
                tasks: Vec::new(),
            },
        );
        Self {
            users: BTreeMap::new(),
            lists,
        }
    }

    /// Register a new account with an already-hashed password digest.
    pub fn create_account(&mut self, username: &str, digest: String) -> Result<(), DomainError> {
        if self.users.contains_key(username) {
            return Err(DomainError::DuplicateUser);
        }
        self.users.insert(username.to_string(), digest);
        Ok(())
    }

    /// Remove an account and every task it authored, in every list.
    ///
    /// Membership entries are left in place, and a second deletion of the
    /// same username is a no-op, so a confirmation racing another session
    /// cannot fail.
    pub fn delete_account(&mut self, username: &str) -> Result<(), DomainError> {
        self.users.remove(username);
        for list in self.lists.values_mut() {
            list.tasks.retain(|t| t.user != username);
        }
        Ok(())
    }

    pub fn create_list(&mut self, code: &str, name: &str, owner: &str) -> Result<(), DomainError> {
        if self.lists.contains_key(code) {
            return Err(DomainError::ListExists(code.to_string()));
        }
        self.lists.insert(
            code.to_string(),
            TaskList {
                name: name.to_string(),
                owner: Some(owner.to_string()),
                members: vec![owner.to_string()],
                tasks: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn join_list(&mut self, code: &str, username: &str) -> Result<(), DomainError> {
        if !self.lists.contains_key(code) {
            return Err(DomainError::ListNotFound(code.to_string()));
        }
        if self.is_member(code, username) {
            return Err(DomainError::AlreadyMember);
        }
        let list = self
            .lists
            .get_mut(code)
            .ok_or_else(|| DomainError::ListNotFound(code.to_string()))?;
        list.members.push(username.to_string());
        Ok(())
    }

    /// True if `username` is the owner of the list or in its members.
    pub fn is_member(&self, code: &str, username: &str) -> bool {
        let Some(list) = self.lists.get(code) else {
            return false;
        };
        list.owner.as_deref() == Some(username) || list.members.iter().any(|m| m == username)
    }

    /// Append a task, returning its generated id.
    ///
    /// Ids are truncated UUIDv4 tokens, redrawn until unique among the
    /// list's live tasks.
    pub fn add_task(&mut self, code: &str, text: &str, author: &str) -> Result<String, DomainError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::EmptyText);
        }
        let list = self
            .lists
            .get_mut(code)
            .ok_or_else(|| DomainError::ListNotFound(code.to_string()))?;
        let id = loop {
            let token = Uuid::new_v4().simple().to_string();
            let candidate = &token[..TASK_ID_LEN];
            if !list.tasks.iter().any(|t| t.id == candidate) {
                break candidate.to_string();
            }
        };
        list.tasks.push(Task {
            id: id.clone(),
            text: text.to_string(),
            done: false,
            user: author.to_string(),
        });
        Ok(id)
    }

    /// Flip a task to done. Marking an already-done task is a successful
    /// no-op reported as [`MarkDone::AlreadyDone`]; `done` never goes back
    /// to false.
    pub fn mark_done(&mut self, code: &str, id: &str) -> Result<MarkDone, DomainError> {
        let list = self
            .lists
            .get_mut(code)
            .ok_or_else(|| DomainError::ListNotFound(code.to_string()))?;
        let task = list
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| DomainError::TaskNotFound(id.to_string()))?;
        if task.done {
            Ok(MarkDone::AlreadyDone)
        } else {
            task.done = true;
            Ok(MarkDone::Marked)
        }
    }

    /// Remove a task by id. Unknown ids are a silent no-op.
    pub fn delete_task(&mut self, code: &str, id: &str) -> Result<(), DomainError> {
        let list = self
            .lists
            .get_mut(code)
            .ok_or_else(|| DomainError::ListNotFound(code.to_string()))?;
        list.tasks.retain(|t| t.id != id);
        Ok(())
    }
}
