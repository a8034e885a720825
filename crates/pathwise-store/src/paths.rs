// ABOUTME: Learning-path operations layered on the generic record store.
// ABOUTME: Adds draft-based creation and progress updates that mark a path as just accessed.

use pathwise_core::{LearningPath, NewLearningPath, ProgressUpdate};

use crate::store::{Outcome, RecordStore, StoreError};

/// The record store specialized to learning paths.
pub type PathStore = RecordStore<LearningPath>;

impl RecordStore<LearningPath> {
    /// Persist a new path from a draft and return its key.
    pub async fn add_path(&self, draft: NewLearningPath) -> Result<Outcome<String>, StoreError> {
        self.create(draft.into_record()).await
    }

    /// Record progress on a path. Sets `lastAccessed` to "Just now" and
    /// follows the same fallback rules as `update`.
    pub async fn update_progress(
        &self,
        key: &str,
        update: ProgressUpdate,
    ) -> Result<Outcome<()>, StoreError> {
        self.update(key, &update.into_patch()).await
    }
}
