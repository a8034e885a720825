// ABOUTME: Learning path records in their complete, draft, and partial-update forms.
// ABOUTME: Also holds the form validation rules applied before a path reaches the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::Record;

/// Recency label given to a path that has never been opened.
pub const NEVER_ACCESSED: &str = "Never";

/// Recency label written by a progress update.
pub const JUST_ACCESSED: &str = "Just now";

const MIN_TITLE_LEN: usize = 3;

/// Reasons a path draft or update is rejected before it reaches storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("owner id must not be empty")]
    EmptyOwner,

    #[error("path title must be at least 3 characters")]
    TitleTooShort,

    #[error("at least 1 course is required")]
    NoCourses,

    #[error("progress must be between 0 and 100, got {0}")]
    ProgressOutOfRange(u32),

    #[error("completed courses ({completed}) exceed total courses ({total})")]
    CompletedExceedsTotal { completed: u32, total: u32 },
}

/// A learning path as persisted by either backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub title: String,
    pub progress: u32,
    pub total_courses: u32,
    pub completed_courses: u32,
    pub last_accessed: String,
    pub deadline: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A path that has not been persisted yet: no key, no store timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLearningPath {
    pub user_id: String,
    pub title: String,
    pub total_courses: u32,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub completed_courses: u32,
    #[serde(default = "never_accessed")]
    pub last_accessed: String,
}

fn never_accessed() -> String {
    NEVER_ACCESSED.to_string()
}

impl NewLearningPath {
    /// Create a draft with zero progress.
    pub fn new(user_id: String, title: String, total_courses: u32, deadline: DateTime<Utc>) -> Self {
        Self {
            user_id,
            title,
            total_courses,
            deadline,
            progress: 0,
            completed_courses: 0,
            last_accessed: never_accessed(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_id.trim().is_empty() {
            return Err(ValidationError::EmptyOwner);
        }
        validate_title(&self.title)?;
        if self.total_courses < 1 {
            return Err(ValidationError::NoCourses);
        }
        validate_progress(self.progress)?;
        Ok(())
    }

    /// Convert into a complete record with no key and no store timestamps.
    pub fn into_record(self) -> LearningPath {
        LearningPath {
            id: None,
            user_id: self.user_id,
            title: self.title,
            progress: self.progress,
            total_courses: self.total_courses,
            completed_courses: self.completed_courses,
            last_accessed: self.last_accessed,
            deadline: self.deadline,
            created_at: None,
            updated_at: None,
        }
    }
}

/// A partial update to a learning path. Absent fields are left untouched.
///
/// `user_id` is a lookup hint naming the owner's local partition. It is
/// never written: ownership is fixed at creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPathPatch {
    #[serde(default, skip_serializing)]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_courses: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_courses: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

impl LearningPathPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if self.total_courses == Some(0) {
            return Err(ValidationError::NoCourses);
        }
        if let Some(progress) = self.progress {
            validate_progress(progress)?;
        }
        if let (Some(completed), Some(total)) = (self.completed_courses, self.total_courses)
            && completed > total
        {
            return Err(ValidationError::CompletedExceedsTotal { completed, total });
        }
        Ok(())
    }
}

/// Progress reported for a path: percentage plus completed course count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub progress: u32,
    pub completed_courses: u32,
}

impl ProgressUpdate {
    /// Check the update against the path's course total, when known.
    pub fn validate(&self, total_courses: Option<u32>) -> Result<(), ValidationError> {
        validate_progress(self.progress)?;
        if let Some(total) = total_courses
            && self.completed_courses > total
        {
            return Err(ValidationError::CompletedExceedsTotal {
                completed: self.completed_courses,
                total,
            });
        }
        Ok(())
    }

    /// The patch a progress update applies, which also marks the path as
    /// just accessed.
    pub fn into_patch(self) -> LearningPathPatch {
        LearningPathPatch {
            progress: Some(self.progress),
            completed_courses: Some(self.completed_courses),
            last_accessed: Some(JUST_ACCESSED.to_string()),
            ..LearningPathPatch::default()
        }
    }
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().chars().count() < MIN_TITLE_LEN {
        return Err(ValidationError::TitleTooShort);
    }
    Ok(())
}

fn validate_progress(progress: u32) -> Result<(), ValidationError> {
    if progress > 100 {
        return Err(ValidationError::ProgressOutOfRange(progress));
    }
    Ok(())
}

impl Record for LearningPath {
    type Patch = LearningPathPatch;

    const COLLECTION: &'static str = "learning-paths";
    const LOCAL_KEY: &'static str = "pathwise-learning-paths";
    const KEY_FIELD: &'static str = "id";
    const TIMESTAMP_FIELDS: &'static [&'static str] = &["deadline", "createdAt", "updatedAt"];

    fn key(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn assign_key(&mut self, key: String) {
        self.id = Some(key);
    }

    fn owner(&self) -> &str {
        &self.user_id
    }

    fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.created_at = Some(now);
        self.updated_at = Some(now);
    }

    fn apply_patch(&mut self, patch: &LearningPathPatch, now: DateTime<Utc>) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(progress) = patch.progress {
            self.progress = progress;
        }
        if let Some(total) = patch.total_courses {
            self.total_courses = total;
        }
        if let Some(completed) = patch.completed_courses {
            self.completed_courses = completed;
        }
        if let Some(label) = &patch.last_accessed {
            self.last_accessed = label.clone();
        }
        if let Some(deadline) = patch.deadline {
            self.deadline = deadline;
        }
        self.updated_at = Some(now);
    }

    fn patch_owner(patch: &LearningPathPatch) -> Option<&str> {
        patch.user_id.as_deref().filter(|owner| !owner.is_empty())
    }
}
