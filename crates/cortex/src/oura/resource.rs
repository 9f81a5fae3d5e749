use serde::{Deserialize, Serialize};

/// One category of Oura data, each served by its own endpoint under `/usercollection`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    PersonalInfo,
    DailySleep,
    Sleep,
    SleepTime,
    DailyReadiness,
    DailyActivity,
    DailyStress,
    Workout,
    HeartRate,
    Session,
    Tag,
    EnhancedTag,
    RestModePeriod,
    RingConfiguration,
}

impl Resource {
    pub fn path(&self) -> &'static str {
        match self {
            Resource::PersonalInfo => "personal_info",
            Resource::DailySleep => "daily_sleep",
            Resource::Sleep => "sleep",
            Resource::SleepTime => "sleep_time",
            Resource::DailyReadiness => "daily_readiness",
            Resource::DailyActivity => "daily_activity",
            Resource::DailyStress => "daily_stress",
            Resource::Workout => "workout",
            Resource::HeartRate => "heartrate",
            Resource::Session => "session",
            Resource::Tag => "tag",
            Resource::EnhancedTag => "enhanced_tag",
            Resource::RestModePeriod => "rest_mode_period",
            Resource::RingConfiguration => "ring_configuration",
        }
    }

    /// Singleton endpoints return a bare object and take no query parameters
    pub fn is_collection(&self) -> bool {
        !matches!(self, Resource::PersonalInfo)
    }
}
