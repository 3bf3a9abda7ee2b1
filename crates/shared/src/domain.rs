use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(NotificationId);
id_newtype!(TestimonialId);
id_newtype!(SocialLinkId);
id_newtype!(UserId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[default]
    Info,
    Success,
    Warning,
    Danger,
}

/// Presentation attributes for a notification kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindStyle {
    pub icon: &'static str,
    pub accent: &'static str,
    pub label: &'static str,
}

const KIND_STYLES: [(NotificationKind, KindStyle); 4] = [
    (
        NotificationKind::Info,
        KindStyle {
            icon: "i",
            accent: "blue",
            label: "Info",
        },
    ),
    (
        NotificationKind::Success,
        KindStyle {
            icon: "+",
            accent: "green",
            label: "Success",
        },
    ),
    (
        NotificationKind::Warning,
        KindStyle {
            icon: "!",
            accent: "yellow",
            label: "Warning",
        },
    ),
    (
        NotificationKind::Danger,
        KindStyle {
            icon: "x",
            accent: "red",
            label: "Danger",
        },
    ),
];

impl NotificationKind {
    pub const ALL: [NotificationKind; 4] = [
        NotificationKind::Info,
        NotificationKind::Success,
        NotificationKind::Warning,
        NotificationKind::Danger,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Danger => "danger",
        }
    }

    pub fn style(self) -> KindStyle {
        KIND_STYLES[self as usize].1
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::UnknownKind(s.to_string()))
    }
}

/// Notification priority, always within `MIN..=MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self, ValidationError> {
        Self::try_from(value)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<i64> for Priority {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ValidationError::PriorityOutOfRange {
                min: Self::MIN,
                max: Self::MAX,
                actual: value,
            })
        }
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        value.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(alias = "_id")]
    pub id: NotificationId,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub priority: Priority,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Locally edited copy of a notification, sent as the create/update body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDraft {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub priority: Priority,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
}

impl NotificationDraft {
    pub fn new(message: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::default(),
            priority: Priority::default(),
            is_active: true,
            expires_at,
        }
    }

    pub fn with_kind(mut self, kind: NotificationKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.message.trim().is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        Ok(())
    }
}

impl From<&Notification> for NotificationDraft {
    fn from(value: &Notification) -> Self {
        Self {
            message: value.message.clone(),
            kind: value.kind,
            priority: value.priority,
            is_active: value.is_active,
            expires_at: value.expires_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    #[serde(alias = "_id")]
    pub id: TestimonialId,
    #[serde(alias = "name")]
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(alias = "text")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLink {
    #[serde(alias = "_id")]
    pub id: SocialLinkId,
    pub platform: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    #[serde(alias = "_id")]
    pub id: UserId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
