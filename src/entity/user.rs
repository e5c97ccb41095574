//! The User entity: the remote-assigned account record.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Optional, nested user attributes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserAttributes {
    /// Default notebook location name.
    pub default_location_name: Option<String>,
    /// Viewing timezone, e.g. "America/Los_Angeles".
    pub timezone: Option<String>,
    /// Whether the account prefers a dark theme.
    pub uses_dark_theme: Option<bool>,
}

/// Billing/accounting state for the account.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Accounting {
    /// Upload-limit bytes for the current billing period.
    pub upload_limit: Option<i64>,
    /// End of the current billing period.
    pub upload_limit_end: Option<Timestamp>,
    /// Premium service expiration time, if applicable.
    pub premium_service_expiration: Option<Timestamp>,
}

/// Premium-tier metadata, present only for premium accounts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PremiumInfo {
    /// Whether the premium subscription currently auto-renews.
    pub premium_subscription_active: Option<bool>,
}

/// Business-account metadata, present only for business accounts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessUserInfo {
    /// Business account identifier.
    pub business_id: Option<i64>,
    /// Display name of the business.
    pub business_name: Option<String>,
    /// Role held within the business.
    pub role: Option<i32>,
}

/// A User: the remote-assigned account record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Remote-assigned numeric identifier; primary key.
    pub id: i64,
    /// Account username.
    pub username: Option<String>,
    /// Account email.
    pub email: Option<String>,
    /// Privilege level (0 = normal, higher = premium/business tiers).
    pub privilege_level: Option<i32>,
    /// Creation time.
    pub creation_timestamp: Option<Timestamp>,
    /// Last-modification time.
    pub modification_timestamp: Option<Timestamp>,
    /// Present once the account has been (soft-)deleted.
    pub deletion_timestamp: Option<Timestamp>,
    /// Whether the account is currently active.
    pub is_active: bool,
    /// Nested optional attributes.
    pub attributes: Option<UserAttributes>,
    /// Nested optional billing state.
    pub accounting: Option<Accounting>,
    /// Nested optional premium-tier metadata.
    pub premium_info: Option<PremiumInfo>,
    /// Nested optional business-account metadata.
    pub business_info: Option<BusinessUserInfo>,
}
