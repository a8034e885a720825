// ABOUTME: Core library for PathWise, containing the record types shared by every backend.
// ABOUTME: Defines learning paths, user settings, the Record trait, key tagging, and timestamp normalization.

pub mod key;
pub mod path;
pub mod record;
pub mod settings;
pub mod timestamp;

pub use key::{LOCAL_KEY_PREFIX, is_local_key, mint_local_key};
pub use path::{LearningPath, LearningPathPatch, NewLearningPath, ProgressUpdate, ValidationError};
pub use record::Record;
pub use settings::{DashboardLayout, SettingUpdate, Theme, UserSettings, UserSettingsPatch};
pub use timestamp::{normalize_document, normalize_timestamp};
