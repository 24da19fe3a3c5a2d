use serde::{Deserialize, Serialize};

use super::repo_types::User;
use super::services::{LeaderboardEntry, SignInOutcome, VerifyOutcome};

/// Body of `POST /api/send-signin-email`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSignInRequest {
    pub email: Option<String>,
    pub referral_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSignInResponse {
    pub success: bool,
    pub message: &'static str,
    pub email_sent: bool,
}

impl From<SignInOutcome> for SendSignInResponse {
    fn from(o: SignInOutcome) -> Self {
        Self {
            success: true,
            message: if o.email_sent {
                "Verification email sent"
            } else {
                "Signup recorded; verification email could not be sent"
            },
            email_sent: o.email_sent,
        }
    }
}

/// Body of `POST /api/verify-success`. Either field identifies the user.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub email: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub already_verified: bool,
    pub referral_code: String,
}

impl From<VerifyOutcome> for VerifyResponse {
    fn from(o: VerifyOutcome) -> Self {
        Self {
            success: true,
            already_verified: o.already_verified,
            referral_code: o.referral_code,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardItem {
    pub rank: usize,
    pub email: String,
    pub referral_code: String,
    pub referral_count: u64,
}

impl From<LeaderboardEntry> for LeaderboardItem {
    fn from(e: LeaderboardEntry) -> Self {
        Self {
            rank: e.rank,
            email: e.email,
            referral_code: e.referral_code,
            referral_count: e.referral_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralStatsResponse {
    pub email: String,
    pub referral_code: String,
    pub referral_count: u64,
    pub referred_by: Option<String>,
}

impl From<User> for ReferralStatsResponse {
    fn from(u: User) -> Self {
        Self {
            email: u.email,
            referral_code: u.referral_code,
            referral_count: u.referral_count,
            referred_by: u.referred_by,
        }
    }
}
