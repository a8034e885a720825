// ABOUTME: Settings operations layered on the generic record store.
// ABOUTME: Settings are created lazily on first read and updated one field at a time.

use chrono::Utc;
use pathwise_core::{Record, SettingUpdate, UserSettings, UserSettingsPatch};

use crate::store::{Outcome, RecordStore, StoreError, decode, to_document};

/// The record store specialized to per-user settings.
pub type SettingsStore = RecordStore<UserSettings>;

impl RecordStore<UserSettings> {
    /// Fetch a user's settings, creating the default record if the user
    /// has none yet. When the remote is unavailable at any step, the local
    /// copy is used, or a local default record is created.
    pub async fn get_or_create(&self, owner: &str) -> Result<Outcome<UserSettings>, StoreError> {
        let fetched = match self.remote.get(UserSettings::COLLECTION, owner).await {
            Ok(Some(doc)) => decode::<UserSettings>(owner, doc).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };

        match fetched {
            Ok(Some(settings)) => {
                self.mirror(&settings);
                self.remote_ok();
                Ok(Outcome::remote(settings))
            }
            Ok(None) => {
                let defaults = UserSettings::defaults_for(owner, Utc::now());
                let doc = to_document(&defaults)?;
                match self.remote.set(UserSettings::COLLECTION, owner, doc).await {
                    Ok(()) => {
                        tracing::info!("created default settings for {}", owner);
                        self.mirror(&defaults);
                        self.remote_ok();
                        Ok(Outcome::remote(defaults))
                    }
                    Err(e) => {
                        self.fall_back("create settings", &e);
                        self.local_or_default(owner)
                    }
                }
            }
            Err(e) => {
                self.fall_back("get settings", &e);
                self.local_or_default(owner)
            }
        }
    }

    /// Merge a partial update into a user's settings. If the remote is
    /// unavailable and no local record exists, a local default record with
    /// the update applied is created.
    pub async fn update_settings(
        &self,
        owner: &str,
        patch: &UserSettingsPatch,
    ) -> Result<Outcome<()>, StoreError> {
        match self.update(owner, patch).await {
            Err(StoreError::NotFound(_)) => {
                let now = Utc::now();
                let mut settings = UserSettings::defaults_for(owner, now);
                settings.apply_patch(patch, now);
                self.local.upsert(&settings)?;
                Ok(Outcome::local(()))
            }
            other => other,
        }
    }

    /// Change a single settings field.
    pub async fn update_setting(
        &self,
        owner: &str,
        update: SettingUpdate,
    ) -> Result<Outcome<()>, StoreError> {
        tracing::debug!("updating {} for {}", update.field_name(), owner);
        self.update_settings(owner, &update.into_patch()).await
    }

    fn local_or_default(&self, owner: &str) -> Result<Outcome<UserSettings>, StoreError> {
        if let Some(settings) = self.local.find(owner) {
            return Ok(Outcome::local(settings));
        }
        let defaults = UserSettings::defaults_for(owner, Utc::now());
        self.local.upsert(&defaults)?;
        Ok(Outcome::local(defaults))
    }
}
