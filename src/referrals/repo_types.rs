use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Verified user document, keyed by email.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    pub referral_code: String,
    #[serde(default)]
    pub referral_count: u64,
    #[serde(default)]
    pub referred_by: Option<String>, // referrer email
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Referral recorded at signup, consumed when the invitee verifies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingReferral {
    pub email: String,
    pub referred_by: String,
    pub referral_code: String, // as supplied at signup
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Claim on a referral code, keyed by the code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeReservation {
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub const REFERRAL_COUNT: &str = "referralCount";
pub const REFERRAL_CODE: &str = "referralCode";
