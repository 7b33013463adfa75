use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Quiz,
    Coding,
    DragDrop,
    Assignment,
    Material,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Quiz => "quiz",
            ActivityType::Coding => "coding",
            ActivityType::DragDrop => "drag_drop",
            ActivityType::Assignment => "assignment",
            ActivityType::Material => "material",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown activity type: {0}")]
pub struct UnknownActivityType(pub String);

impl std::str::FromStr for ActivityType {
    type Err = UnknownActivityType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiz" => Ok(ActivityType::Quiz),
            "coding" => Ok(ActivityType::Coding),
            "drag_drop" | "dragdrop" => Ok(ActivityType::DragDrop),
            "assignment" => Ok(ActivityType::Assignment),
            "material" => Ok(ActivityType::Material),
            other => Err(UnknownActivityType(other.to_string())),
        }
    }
}

impl TryFrom<String> for ActivityType {
    type Error = UnknownActivityType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Scheduling and presentation settings of an activity.
///
/// The named fields are the ones the backend reasons about; anything else the
/// client stores is carried through untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_date_time: Option<DateTime<Utc>>,
    /// Minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl ActivityConfig {
    /// A submission is late only when a due date exists and `at` is strictly after it.
    pub fn is_late_at(&self, at: DateTime<Utc>) -> bool {
        self.due_date_time.map(|due| at > due).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: i64,
    pub instructor_id: i64,
    pub title: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub activity_type: ActivityType,
    pub config: Json<ActivityConfig>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub instructor_id: i64,
    pub title: String,
    pub description: String,
    pub activity_type: ActivityType,
    pub config: ActivityConfig,
}

#[derive(Debug, Clone)]
pub struct ActivityUpdate {
    pub title: String,
    pub description: String,
    pub config: ActivityConfig,
}
