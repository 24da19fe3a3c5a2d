use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use super::repo_types::{CodeReservation, PendingReferral, User, REFERRAL_CODE, REFERRAL_COUNT};
use crate::store::{
    ConsumeOutcome, DocRef, DocumentStore, StoreError, PENDING_REFERRALS, REFERRAL_CODES, USERS,
};

fn decode<T: DeserializeOwned>(doc: Value) -> Result<T, StoreError> {
    Ok(serde_json::from_value(doc)?)
}

fn encode<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(value)?)
}

pub async fn find_user(store: &dyn DocumentStore, email: &str) -> Result<Option<User>, StoreError> {
    store.get_by_key(USERS, email).await?.map(decode).transpose()
}

pub async fn find_user_by_code(
    store: &dyn DocumentStore,
    code: &str,
) -> Result<Option<User>, StoreError> {
    let hits = store
        .query(USERS, REFERRAL_CODE, &Value::from(code), 1)
        .await?;
    hits.into_iter().next().map(|(_, doc)| decode(doc)).transpose()
}

/// Returns `false` when a user document already exists for the email.
pub async fn create_user_if_absent(store: &dyn DocumentStore, user: &User) -> Result<bool, StoreError> {
    store.create_if_absent(USERS, &user.email, encode(user)?).await
}

pub async fn top_users(store: &dyn DocumentStore, limit: usize) -> Result<Vec<User>, StoreError> {
    store
        .top_by_field(USERS, REFERRAL_COUNT, limit)
        .await?
        .into_iter()
        .map(|(_, doc)| decode(doc))
        .collect()
}

pub async fn get_pending(
    store: &dyn DocumentStore,
    email: &str,
) -> Result<Option<PendingReferral>, StoreError> {
    store
        .get_by_key(PENDING_REFERRALS, email)
        .await?
        .map(decode)
        .transpose()
}

pub async fn put_pending(store: &dyn DocumentStore, pending: &PendingReferral) -> Result<(), StoreError> {
    store
        .set_by_key(PENDING_REFERRALS, &pending.email, encode(pending)?)
        .await
}

/// Deletes the invitee's pending referral and credits the referrer once.
pub async fn consume_pending_and_credit(
    store: &dyn DocumentStore,
    email: &str,
    referrer: &str,
) -> Result<ConsumeOutcome, StoreError> {
    store
        .consume_and_increment(
            DocRef::new(PENDING_REFERRALS, email),
            DocRef::new(USERS, referrer),
            REFERRAL_COUNT,
            1,
        )
        .await
}

/// Claims `code` for `owner`. Returns `false` when the code is taken.
pub async fn reserve_code(store: &dyn DocumentStore, code: &str, owner: &str) -> Result<bool, StoreError> {
    let reservation = CodeReservation {
        email: owner.to_string(),
        created_at: OffsetDateTime::now_utc(),
    };
    store
        .create_if_absent(REFERRAL_CODES, code, encode(&reservation)?)
        .await
}

pub async fn release_code(store: &dyn DocumentStore, code: &str) -> Result<bool, StoreError> {
    store.delete_by_key(REFERRAL_CODES, code).await
}
