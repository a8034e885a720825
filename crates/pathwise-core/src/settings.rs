// ABOUTME: Per-user settings records, keyed one-to-one by the owning user's id.
// ABOUTME: Provides the documented defaults, a partial-update form, and single-field updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Colour scheme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    System,
}

/// Dashboard density preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardLayout {
    Compact,
    Standard,
    Detailed,
}

pub const DEFAULT_GOAL_HOURS_PER_WEEK: f64 = 15.0;
pub const DEFAULT_ACCENT_COLOR: &str = "#3b82f6";

/// A user's settings. The owner id doubles as the record key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub user_id: String,
    pub theme: Theme,
    pub goal_hours_per_week: f64,
    pub email_notifications: bool,
    pub dashboard_layout: DashboardLayout,
    pub accent_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserSettings {
    /// Default settings for a user, stamped with the given time.
    pub fn defaults_for(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            theme: Theme::System,
            goal_hours_per_week: DEFAULT_GOAL_HOURS_PER_WEEK,
            email_notifications: true,
            dashboard_layout: DashboardLayout::Standard,
            accent_color: DEFAULT_ACCENT_COLOR.to_string(),
            reminder_time: None,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

/// A partial update to a user's settings. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_hours_per_week: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_notifications: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_layout: Option<DashboardLayout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_time: Option<String>,
}

/// Exactly one settings field and its new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum SettingUpdate {
    Theme(Theme),
    GoalHoursPerWeek(f64),
    EmailNotifications(bool),
    DashboardLayout(DashboardLayout),
    AccentColor(String),
    ReminderTime(String),
}

impl SettingUpdate {
    /// The camelCase name of the field this update touches.
    pub fn field_name(&self) -> &'static str {
        match self {
            SettingUpdate::Theme(_) => "theme",
            SettingUpdate::GoalHoursPerWeek(_) => "goalHoursPerWeek",
            SettingUpdate::EmailNotifications(_) => "emailNotifications",
            SettingUpdate::DashboardLayout(_) => "dashboardLayout",
            SettingUpdate::AccentColor(_) => "accentColor",
            SettingUpdate::ReminderTime(_) => "reminderTime",
        }
    }

    /// Build an update from a field name and a JSON value, as received
    /// from a settings panel. Returns None for unknown fields or values of
    /// the wrong type.
    pub fn from_field(field: &str, value: serde_json::Value) -> Option<Self> {
        let tagged = serde_json::json!({ "field": field, "value": value });
        let update: SettingUpdate = serde_json::from_value(tagged).ok()?;
        if let SettingUpdate::GoalHoursPerWeek(hours) = update
            && !(hours.is_finite() && hours > 0.0)
        {
            return None;
        }
        Some(update)
    }

    pub fn into_patch(self) -> UserSettingsPatch {
        let mut patch = UserSettingsPatch::default();
        match self {
            SettingUpdate::Theme(theme) => patch.theme = Some(theme),
            SettingUpdate::GoalHoursPerWeek(hours) => patch.goal_hours_per_week = Some(hours),
            SettingUpdate::EmailNotifications(on) => patch.email_notifications = Some(on),
            SettingUpdate::DashboardLayout(layout) => patch.dashboard_layout = Some(layout),
            SettingUpdate::AccentColor(color) => patch.accent_color = Some(color),
            SettingUpdate::ReminderTime(time) => patch.reminder_time = Some(time),
        }
        patch
    }
}

impl Record for UserSettings {
    type Patch = UserSettingsPatch;

    const COLLECTION: &'static str = "user-settings";
    const LOCAL_KEY: &'static str = "pathwise-user-settings";
    const KEY_FIELD: &'static str = "userId";
    const TIMESTAMP_FIELDS: &'static [&'static str] = &["createdAt", "updatedAt"];

    fn key(&self) -> Option<&str> {
        Some(&self.user_id)
    }

    fn assign_key(&mut self, key: String) {
        self.user_id = key;
    }

    fn owner(&self) -> &str {
        &self.user_id
    }

    fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.created_at = Some(now);
        self.updated_at = Some(now);
    }

    fn apply_patch(&mut self, patch: &UserSettingsPatch, now: DateTime<Utc>) {
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(hours) = patch.goal_hours_per_week {
            self.goal_hours_per_week = hours;
        }
        if let Some(on) = patch.email_notifications {
            self.email_notifications = on;
        }
        if let Some(layout) = patch.dashboard_layout {
            self.dashboard_layout = layout;
        }
        if let Some(color) = &patch.accent_color {
            self.accent_color = color.clone();
        }
        if let Some(time) = &patch.reminder_time {
            self.reminder_time = Some(time.clone());
        }
        self.updated_at = Some(now);
    }

    fn patch_owner(_patch: &UserSettingsPatch) -> Option<&str> {
        None
    }
}
