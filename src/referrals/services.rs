use time::OffsetDateTime;
use tracing::{error, info, warn};

use super::codes::CodeGenerator;
use super::repo;
use super::repo_types::{PendingReferral, User};
use crate::auth::email::normalize_email;
use crate::error::{AppError, AppResult};
use crate::mail::templates;
use crate::state::AppState;
use crate::store::ConsumeOutcome;

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
pub const MAX_LEADERBOARD_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct SignInOutcome {
    pub email: String,
    pub referred_by: Option<String>,
    pub email_sent: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerifyOutcome {
    pub email: String,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub already_verified: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub email: String, // masked
    pub referral_code: String,
    pub referral_count: u64,
}

/// Resolves the referrer for a signup and parks the referral until verification.
/// A blank or absent code records nothing.
pub async fn record_signup_referral(
    st: &AppState,
    email: &str,
    referral_code: Option<&str>,
) -> AppResult<Option<String>> {
    let Some(code) = referral_code.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };

    let Some(referrer) = repo::find_user_by_code(st.store.as_ref(), code).await? else {
        warn!(email = %email, code = %code, "unknown referral code");
        return Err(AppError::InvalidReferralCode);
    };

    let pending = PendingReferral {
        email: email.to_string(),
        referred_by: referrer.email.clone(),
        referral_code: code.to_string(),
        created_at: OffsetDateTime::now_utc(),
    };
    repo::put_pending(st.store.as_ref(), &pending).await?;
    info!(email = %email, referrer = %referrer.email, "pending referral recorded");
    Ok(Some(referrer.email))
}

/// Consumes the pending referral for `email` and credits `referrer`, the
/// referrer recorded on the user, at most once. A pending record replaced by a
/// later signup is still consumed, but the credit never moves to its referrer.
/// Returns the credited referrer, or `None` when there was nothing to apply.
pub async fn finalize_referral(
    st: &AppState,
    email: &str,
    referrer: &str,
) -> AppResult<Option<String>> {
    if let Some(pending) = repo::get_pending(st.store.as_ref(), email).await? {
        if pending.referred_by != referrer {
            warn!(
                email = %email,
                recorded = %referrer,
                pending = %pending.referred_by,
                "pending referral names another referrer; crediting the recorded one"
            );
        }
    }
    credit_referrer(st, email, referrer).await
}

async fn credit_referrer(st: &AppState, email: &str, referrer: &str) -> AppResult<Option<String>> {
    match repo::consume_pending_and_credit(st.store.as_ref(), email, referrer).await? {
        ConsumeOutcome::NothingToConsume => Ok(None),
        ConsumeOutcome::Consumed {
            new_value: Some(count),
        } => {
            info!(email = %email, referrer = %referrer, count, "referral credited");
            Ok(Some(referrer.to_string()))
        }
        ConsumeOutcome::Consumed { new_value: None } => {
            warn!(email = %email, referrer = %referrer, "referrer no longer exists; referral dropped");
            Ok(None)
        }
    }
}

/// Starts a signup: validates input, parks the referral and emails a sign-in link.
pub async fn request_sign_in(
    st: &AppState,
    email: Option<&str>,
    referral_code: Option<&str>,
) -> AppResult<SignInOutcome> {
    let email = normalize_email(email)?;

    if repo::find_user(st.store.as_ref(), &email).await?.is_some() {
        warn!(email = %email, "signup for registered email");
        return Err(AppError::AlreadyRegistered);
    }

    let referred_by = record_signup_referral(st, &email, referral_code).await?;

    let link = st
        .links
        .mint_sign_in_link(&email, &st.config.link.return_url)
        .await?;
    info!(email = %email, "sign-in link generated");

    let email_sent = match st
        .mailer
        .send(&email, templates::SIGN_IN_SUBJECT, &templates::sign_in_html(&link))
        .await
    {
        Ok(()) => {
            info!(email = %email, "sign-in email sent");
            true
        }
        Err(e) => {
            error!(error = %e, email = %email, "sign-in email failed");
            false
        }
    };

    Ok(SignInOutcome {
        email,
        referred_by,
        email_sent,
    })
}

async fn resolve_verified_email(
    st: &AppState,
    email: Option<&str>,
    token: Option<&str>,
) -> AppResult<String> {
    let token = token.map(str::trim).filter(|t| !t.is_empty());
    let Some(token) = token else {
        return normalize_email(email);
    };

    let from_token = st.links.verify_sign_in_token(token).await.map_err(|e| {
        warn!(error = %e, "sign-in token rejected");
        AppError::InvalidSignInLink
    })?;
    let from_token = normalize_email(Some(from_token.as_str()))?;

    if let Some(claimed) = email.map(str::trim).filter(|e| !e.is_empty()) {
        if normalize_email(Some(claimed))? != from_token {
            warn!(claimed = %claimed, token_email = %from_token, "email does not match sign-in link");
            return Err(AppError::InvalidSignInLink);
        }
    }
    Ok(from_token)
}

/// Completes a signup. Safe to call repeatedly: only the first call creates
/// the user and credits the referrer.
pub async fn verify(
    st: &AppState,
    email: Option<&str>,
    token: Option<&str>,
) -> AppResult<VerifyOutcome> {
    let email = resolve_verified_email(st, email, token).await?;
    let store = st.store.as_ref();

    if let Some(existing) = repo::find_user(store, &email).await? {
        resume_interrupted_referral(st, &existing).await?;
        info!(email = %email, "already verified");
        return Ok(VerifyOutcome {
            email,
            referral_code: existing.referral_code,
            referred_by: existing.referred_by,
            already_verified: true,
        });
    }

    let pending = repo::get_pending(store, &email).await?;
    let generator = CodeGenerator::new(&st.config.referral);
    let referral_code = generator.generate_unique_code(store, &email).await?;

    let user = User {
        email: email.clone(),
        referral_code: referral_code.clone(),
        referral_count: 0,
        referred_by: pending.map(|p| p.referred_by),
        created_at: OffsetDateTime::now_utc(),
    };

    let created = match repo::create_user_if_absent(store, &user).await {
        Ok(created) => created,
        Err(e) => {
            release_reserved_code(st, &referral_code).await;
            return Err(e.into());
        }
    };
    if !created {
        // A concurrent verification created the user first.
        release_reserved_code(st, &referral_code).await;
        let winner = repo::find_user(store, &email).await?.ok_or(AppError::NotFound)?;
        info!(email = %email, "lost verification race");
        return Ok(VerifyOutcome {
            email,
            referral_code: winner.referral_code,
            referred_by: winner.referred_by,
            already_verified: true,
        });
    }
    info!(email = %email, code = %referral_code, "verified user saved");

    if let Some(referrer) = user.referred_by.as_deref() {
        finalize_referral(st, &email, referrer).await?;
    }

    let html = templates::welcome_html(&referral_code, &st.config.site_url);
    match st.mailer.send(&email, templates::WELCOME_SUBJECT, &html).await {
        Ok(()) => info!(email = %email, "welcome email sent"),
        Err(e) => warn!(error = %e, email = %email, "could not send welcome email"),
    }

    Ok(VerifyOutcome {
        email,
        referral_code,
        referred_by: user.referred_by,
        already_verified: false,
    })
}

async fn release_reserved_code(st: &AppState, code: &str) {
    if let Err(e) = repo::release_code(st.store.as_ref(), code).await {
        warn!(error = %e, code = %code, "could not release reserved referral code");
    }
}

/// Applies a referral whose user was saved but whose credit never landed.
async fn resume_interrupted_referral(st: &AppState, user: &User) -> AppResult<()> {
    let Some(referrer) = user.referred_by.as_deref() else {
        return Ok(());
    };
    match repo::get_pending(st.store.as_ref(), &user.email).await? {
        Some(p) if p.referred_by == referrer => {
            warn!(email = %user.email, "resuming interrupted referral credit");
            finalize_referral(st, &user.email, referrer).await?;
        }
        _ => {}
    }
    Ok(())
}

pub fn mask_email(email: &str) -> String {
    let Some((local, domain)) = email.split_once('@') else {
        return "***".into();
    };
    let keep = if local.chars().count() > 2 { 2 } else { 1 };
    let head: String = local.chars().take(keep).collect();
    format!("{head}***@{domain}")
}

pub async fn leaderboard(st: &AppState, limit: Option<usize>) -> AppResult<Vec<LeaderboardEntry>> {
    let limit = limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, MAX_LEADERBOARD_LIMIT);
    let users = repo::top_users(st.store.as_ref(), limit).await?;
    Ok(users
        .into_iter()
        .enumerate()
        .map(|(i, u)| LeaderboardEntry {
            rank: i + 1,
            email: mask_email(&u.email),
            referral_code: u.referral_code,
            referral_count: u.referral_count,
        })
        .collect())
}

pub async fn referral_stats(st: &AppState, email: &str) -> AppResult<User> {
    let email = normalize_email(Some(email))?;
    repo::find_user(st.store.as_ref(), &email)
        .await?
        .ok_or(AppError::NotFound)
}
