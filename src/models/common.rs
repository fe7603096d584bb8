use serde::{Deserialize, Serialize};

/// Provider literal stored on every subscription row
pub const PAYMENT_PROVIDER: &str = "paytabs";

/// Simple message response for error bodies
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorObject,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorObject {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
}

/// Subscription duration tier
///
/// Unrecognized codes are kept verbatim so they can be persisted as-is;
/// they grant no time at all.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlanCode {
    #[default]
    ThirtyDays,
    NinetyDays,
    HalfYear,
    Year,
    Other(String),
}

impl PlanCode {
    pub fn parse(s: &str) -> Self {
        match s {
            "30d" => Self::ThirtyDays,
            "90d" => Self::NinetyDays,
            "180d" => Self::HalfYear,
            "year" => Self::Year,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::ThirtyDays => "30d",
            Self::NinetyDays => "90d",
            Self::HalfYear => "180d",
            Self::Year => "year",
            Self::Other(code) => code,
        }
    }

    /// Length of the entitlement this plan buys
    pub fn duration(&self) -> time::Duration {
        match self {
            Self::ThirtyDays => time::Duration::days(30),
            Self::NinetyDays => time::Duration::days(90),
            Self::HalfYear => time::Duration::days(180),
            Self::Year => time::Duration::days(365),
            Self::Other(_) => time::Duration::ZERO,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl std::fmt::Display for PlanCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription lifecycle status. Only `Active` is ever written here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
        }
    }
}

/// Role granted to a user holding an entitlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Vip,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vip => "vip",
        }
    }
}

/// How a new expiry combines with the one already stored on the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementPolicy {
    /// Always replace the stored expiry with the newest delivery's expiry
    #[default]
    Overwrite,
    /// Keep whichever expiry is later
    ExtendOnly,
}

impl EntitlementPolicy {
    /// Expiry to store given the current value and the incoming one
    pub fn resolve(
        &self,
        current: Option<time::OffsetDateTime>,
        incoming: time::OffsetDateTime,
    ) -> time::OffsetDateTime {
        match (self, current) {
            (Self::ExtendOnly, Some(current)) if current > incoming => current,
            _ => incoming,
        }
    }
}
