use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, warn};

use super::repo;
use crate::config::ReferralConfig;
use crate::error::{AppError, AppResult};
use crate::store::DocumentStore;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Issues `PREFIX-XXXXXX` referral codes.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    prefix: String,
    length: usize,
    max_attempts: usize,
}

impl CodeGenerator {
    pub fn new(cfg: &ReferralConfig) -> Self {
        Self {
            prefix: cfg.code_prefix.clone(),
            length: cfg.code_length,
            max_attempts: cfg.max_attempts,
        }
    }

    pub fn draw_candidate<R: Rng>(&self, rng: &mut R) -> String {
        let suffix: String = (0..self.length)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        format!("{}-{}", self.prefix, suffix)
    }

    /// Draws codes until one is unused and reserves it for `owner`.
    pub async fn generate_unique_code(
        &self,
        store: &dyn DocumentStore,
        owner: &str,
    ) -> AppResult<String> {
        let mut rng = StdRng::from_entropy();
        self.generate_with(store, owner, &mut rng).await
    }

    pub async fn generate_with<R: Rng + Send>(
        &self,
        store: &dyn DocumentStore,
        owner: &str,
        rng: &mut R,
    ) -> AppResult<String> {
        for attempt in 1..=self.max_attempts {
            let candidate = self.draw_candidate(rng);

            // Users written before reservations existed have no reservation document.
            if repo::find_user_by_code(store, &candidate).await?.is_some() {
                debug!(attempt, code = %candidate, "referral code held by a user, redrawing");
                continue;
            }
            if repo::reserve_code(store, &candidate, owner).await? {
                debug!(attempt, code = %candidate, owner = %owner, "referral code reserved");
                return Ok(candidate);
            }
            debug!(attempt, code = %candidate, "referral code already reserved, redrawing");
        }

        warn!(owner = %owner, attempts = self.max_attempts, "referral code generation exhausted");
        Err(AppError::CodeGenerationExhausted(self.max_attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::referrals::repo_types::User;
    use crate::store::{MemoryStore, REFERRAL_CODES};
    use regex::Regex;
    use time::OffsetDateTime;

    fn generator(max_attempts: usize) -> CodeGenerator {
        CodeGenerator::new(&ReferralConfig {
            max_attempts,
            ..ReferralConfig::default()
        })
    }

    async fn seed_user_with_code(store: &MemoryStore, email: &str, code: &str) {
        let user = User {
            email: email.into(),
            referral_code: code.into(),
            referral_count: 0,
            referred_by: None,
            created_at: OffsetDateTime::now_utc(),
        };
        assert!(repo::create_user_if_absent(store, &user).await.unwrap());
    }

    #[test]
    fn candidates_match_the_code_format() {
        let codes = generator(10);
        let re = Regex::new(r"^JUNE-[A-Z0-9]{6}$").unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..500 {
            let code = codes.draw_candidate(&mut rng);
            assert!(re.is_match(&code), "bad code {code}");
        }
    }

    #[test]
    fn prefix_and_length_follow_config() {
        let codes = CodeGenerator::new(&ReferralConfig {
            code_prefix: "MAY".into(),
            code_length: 8,
            max_attempts: 1,
        });
        let code = codes.draw_candidate(&mut StdRng::seed_from_u64(3));
        assert!(Regex::new(r"^MAY-[A-Z0-9]{8}$").unwrap().is_match(&code));
    }

    #[tokio::test]
    async fn skips_every_seeded_collision() {
        let codes = generator(10);
        let store = MemoryStore::new();

        // Replay the same seed to learn which codes will be drawn first.
        let mut preview = StdRng::seed_from_u64(42);
        let drawn: Vec<String> = (0..4).map(|_| codes.draw_candidate(&mut preview)).collect();

        seed_user_with_code(&store, "a@x.com", &drawn[0]).await;
        seed_user_with_code(&store, "b@x.com", &drawn[1]).await;
        // Reserved but not yet attached to a user.
        assert!(repo::reserve_code(&store, &drawn[2], "c@x.com").await.unwrap());

        let mut rng = StdRng::seed_from_u64(42);
        let code = codes.generate_with(&store, "new@x.com", &mut rng).await.unwrap();

        assert_eq!(code, drawn[3]);
        let reservation = store.get_by_key(REFERRAL_CODES, &code).await.unwrap().unwrap();
        assert_eq!(reservation["email"], "new@x.com");
    }

    #[tokio::test]
    async fn fails_after_max_attempts() {
        let codes = generator(3);
        let store = MemoryStore::new();

        let mut preview = StdRng::seed_from_u64(7);
        for i in 0..3 {
            let code = codes.draw_candidate(&mut preview);
            seed_user_with_code(&store, &format!("u{i}@x.com"), &code).await;
        }

        let mut rng = StdRng::seed_from_u64(7);
        let err = codes.generate_with(&store, "new@x.com", &mut rng).await.unwrap_err();
        assert!(matches!(err, AppError::CodeGenerationExhausted(3)));
    }

    #[tokio::test]
    async fn generated_codes_are_distinct() {
        let codes = generator(10);
        let store = MemoryStore::new();
        let mut seen = std::collections::HashSet::new();
        for i in 0..200 {
            let code = codes
                .generate_unique_code(&store, &format!("u{i}@x.com"))
                .await
                .unwrap();
            assert!(seen.insert(code));
        }
    }
}
