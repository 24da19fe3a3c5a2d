use async_trait::async_trait;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::LinkClaims;
use crate::config::LinkConfig;

/// Issues and checks magic sign-in links.
#[async_trait]
pub trait LinkMinter: Send + Sync {
    /// Returns a URL that signs `email` in when opened.
    async fn mint_sign_in_link(&self, email: &str, return_url: &str) -> anyhow::Result<String>;

    /// Returns the email a link token was issued for.
    async fn verify_sign_in_token(&self, token: &str) -> anyhow::Result<String>;
}

/// Signs links with an HMAC secret.
#[derive(Clone)]
pub struct JwtLinkMinter {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl: TimeDuration,
}

impl JwtLinkMinter {
    pub fn new(cfg: &LinkConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            ttl: TimeDuration::minutes(cfg.ttl_minutes),
        }
    }

    fn sign(&self, email: &str) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let claims = LinkClaims {
            sub: email.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: (now + self.ttl).unix_timestamp() as usize,
            iss: self.issuer.clone(),
            jti: Uuid::new_v4(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(email = %email, jti = %claims.jti, "sign-in link signed");
        Ok(token)
    }
}

fn append_token(return_url: &str, token: &str) -> String {
    let sep = if return_url.contains('?') { '&' } else { '?' };
    format!("{return_url}{sep}token={token}")
}

#[async_trait]
impl LinkMinter for JwtLinkMinter {
    async fn mint_sign_in_link(&self, email: &str, return_url: &str) -> anyhow::Result<String> {
        let token = self.sign(email)?;
        Ok(append_token(return_url, &token))
    }

    async fn verify_sign_in_token(&self, token: &str) -> anyhow::Result<String> {
        let mut validation = Validation::default();
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<LinkClaims>(token, &self.decoding, &validation)?;
        debug!(email = %data.claims.sub, jti = %data.claims.jti, "sign-in link verified");
        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minter(secret: &str, issuer: &str) -> JwtLinkMinter {
        JwtLinkMinter::new(&LinkConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            ttl_minutes: 5,
            return_url: "https://june.money/verify".into(),
        })
    }

    fn token_of(link: &str) -> &str {
        link.split("token=").nth(1).expect("link carries a token")
    }

    #[tokio::test]
    async fn minted_link_verifies_to_its_email() {
        let m = minter("dev-secret", "test-issuer");
        let link = m
            .mint_sign_in_link("new@x.com", "https://june.money/verify")
            .await
            .expect("mint");
        assert!(link.starts_with("https://june.money/verify?token="));
        let email = m.verify_sign_in_token(token_of(&link)).await.expect("verify");
        assert_eq!(email, "new@x.com");
    }

    #[tokio::test]
    async fn existing_query_string_is_extended() {
        let m = minter("dev-secret", "iss");
        let link = m
            .mint_sign_in_link("a@b.co", "https://june.money/verify?src=mail")
            .await
            .expect("mint");
        assert!(link.starts_with("https://june.money/verify?src=mail&token="));
    }

    #[tokio::test]
    async fn rejects_foreign_issuer_or_secret() {
        let good = minter("same-secret", "good-iss");
        let other_issuer = minter("same-secret", "bad-iss");
        let other_secret = minter("other-secret", "good-iss");
        let link = good.mint_sign_in_link("a@b.co", "https://x.io/v").await.unwrap();
        assert!(other_issuer.verify_sign_in_token(token_of(&link)).await.is_err());
        assert!(other_secret.verify_sign_in_token(token_of(&link)).await.is_err());
    }

    #[tokio::test]
    async fn rejects_garbage() {
        let m = minter("dev-secret", "iss");
        assert!(m.verify_sign_in_token("not-a-jwt").await.is_err());
    }
}
