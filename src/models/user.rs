use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr, time::Duration};

use crate::error::AppError;

/// Dialog-state label of a user sitting in the main menu
pub const IDLE_STATE: &str = "main_menu";

/// Genres offered by the survey
pub const KNOWN_GENRES: &[&str] = &[
    "Action",
    "RPG",
    "Shooter",
    "Strategy",
    "Simulator",
    "Arcade",
    "Fighting",
    "Adventure",
    "Puzzle",
];

/// Bounds shared by `recommendation_count` and `notification_count`
pub const MIN_BATCH: i32 = 1;
pub const MAX_BATCH: i32 = 5;

/// Gaming platform a user can pick in the survey
///
/// Each platform carries three names: the label shown in the survey, the name
/// stored in the catalog mirror, and the numeric id used by the RAWG API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Platform {
    PlayStation5,
    PlayStation4,
    PlayStation3,
    XboxSeries,
    XboxOne,
    Xbox360,
    Pc,
    NintendoSwitch,
}

impl Platform {
    pub const ALL: [Platform; 8] = [
        Platform::PlayStation5,
        Platform::PlayStation4,
        Platform::PlayStation3,
        Platform::XboxSeries,
        Platform::XboxOne,
        Platform::Xbox360,
        Platform::Pc,
        Platform::NintendoSwitch,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Platform::PlayStation5 => "PlayStation 5",
            Platform::PlayStation4 => "PlayStation 4",
            Platform::PlayStation3 => "PlayStation 3",
            Platform::XboxSeries => "Xbox Series X/S",
            Platform::XboxOne => "Xbox One",
            Platform::Xbox360 => "Xbox 360",
            Platform::Pc => "PC",
            Platform::NintendoSwitch => "Nintendo Switch",
        }
    }

    /// Name under which the platform is stored in the `platforms` table
    pub fn catalog_name(&self) -> &'static str {
        match self {
            Platform::PlayStation5 => "PS5",
            Platform::PlayStation4 => "PS4",
            Platform::PlayStation3 => "PS3",
            Platform::XboxSeries => "XBOX SERIES X/S",
            Platform::XboxOne => "XBOX ONE",
            Platform::Xbox360 => "XBOX 360",
            Platform::Pc => "PC",
            Platform::NintendoSwitch => "Nintendo Switch",
        }
    }

    pub fn rawg_id(&self) -> u32 {
        match self {
            Platform::PlayStation5 => 187,
            Platform::PlayStation4 => 18,
            Platform::PlayStation3 => 16,
            Platform::XboxSeries => 186,
            Platform::XboxOne => 1,
            Platform::Xbox360 => 14,
            Platform::Pc => 4,
            Platform::NintendoSwitch => 7,
        }
    }
}

impl FromStr for Platform {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Platform::ALL
            .into_iter()
            .find(|p| {
                p.label().eq_ignore_ascii_case(needle) || p.catalog_name().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown platform: {}", needle)))
    }
}

impl TryFrom<String> for Platform {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Platform> for String {
    fn from(platform: Platform) -> Self {
        platform.catalog_name().to_string()
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.catalog_name())
    }
}

/// How often scheduled recommendations are pushed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationFrequency {
    #[serde(rename = "never")]
    Never,
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "3days")]
    EveryThreeDays,
    #[serde(rename = "weekly")]
    Weekly,
}

impl NotificationFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationFrequency::Never => "never",
            NotificationFrequency::Daily => "daily",
            NotificationFrequency::EveryThreeDays => "3days",
            NotificationFrequency::Weekly => "weekly",
        }
    }

    /// Minimum gap between two notifications, `None` when disabled
    pub fn interval(&self) -> Option<Duration> {
        const DAY: u64 = 86_400;
        match self {
            NotificationFrequency::Never => None,
            NotificationFrequency::Daily => Some(Duration::from_secs(DAY)),
            NotificationFrequency::EveryThreeDays => Some(Duration::from_secs(3 * DAY)),
            NotificationFrequency::Weekly => Some(Duration::from_secs(7 * DAY)),
        }
    }

    /// Whether a user last notified at `last` should be notified at `now`
    ///
    /// A user that has never been notified is due immediately.
    pub fn is_due(&self, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(interval) = self.interval() else {
            return false;
        };
        match last {
            None => true,
            Some(last) => match (now - last).to_std() {
                Ok(elapsed) => elapsed >= interval,
                // last notification in the future: clock skew, wait it out
                Err(_) => false,
            },
        }
    }
}

impl FromStr for NotificationFrequency {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "never" => Ok(NotificationFrequency::Never),
            "daily" => Ok(NotificationFrequency::Daily),
            "3days" => Ok(NotificationFrequency::EveryThreeDays),
            "weekly" => Ok(NotificationFrequency::Weekly),
            other => Err(AppError::InvalidInput(format!(
                "Unknown notification frequency: {}",
                other
            ))),
        }
    }
}

/// Survey answers that drive candidate selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserPreferences {
    pub platforms: Vec<Platform>,
    pub genres: Vec<String>,
    pub favorite_games: Option<String>,
}

impl UserPreferences {
    /// Platform names as stored in the catalog mirror
    pub fn catalog_platforms(&self) -> Vec<String> {
        self.platforms.iter().map(|p| p.catalog_name().to_string()).collect()
    }
}

/// A bot user
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub preferences: UserPreferences,
    pub recommendation_count: i32,
    pub notification_frequency: NotificationFrequency,
    pub notification_count: i32,
    pub last_activity: DateTime<Utc>,
    pub last_notification: Option<DateTime<Utc>>,
    pub current_state: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_idle(&self) -> bool {
        self.current_state == IDLE_STATE
    }

    /// A user has finished the survey once both platform and genre are set
    pub fn has_profile(&self) -> bool {
        !self.preferences.platforms.is_empty() && !self.preferences.genres.is_empty()
    }
}

#[cfg(test)]
impl User {
    /// Idle user with PC/RPG preferences and default settings
    pub(crate) fn fixture(id: i64) -> Self {
        let now = Utc::now();
        User {
            id,
            telegram_id: 1000 + id,
            preferences: UserPreferences {
                platforms: vec![Platform::Pc],
                genres: vec!["RPG".to_string()],
                favorite_games: None,
            },
            recommendation_count: 3,
            notification_frequency: NotificationFrequency::Weekly,
            notification_count: 5,
            last_activity: now,
            last_notification: None,
            current_state: IDLE_STATE.to_string(),
            created_at: now,
        }
    }
}

/// Partial update of recommendation settings
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SettingsUpdate {
    pub recommendation_count: Option<i32>,
    pub notification_frequency: Option<NotificationFrequency>,
    pub notification_count: Option<i32>,
}

impl SettingsUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        for (name, value) in [
            ("recommendation_count", self.recommendation_count),
            ("notification_count", self.notification_count),
        ] {
            if let Some(v) = value {
                if !(MIN_BATCH..=MAX_BATCH).contains(&v) {
                    return Err(AppError::InvalidInput(format!(
                        "{} must be between {} and {}",
                        name, MIN_BATCH, MAX_BATCH
                    )));
                }
            }
        }
        Ok(())
    }
}
