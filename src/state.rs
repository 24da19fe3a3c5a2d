use std::sync::Arc;

use anyhow::Context;

use crate::auth::{JwtLinkMinter, LinkMinter};
use crate::config::{AppConfig, MailBackend, StoreBackend};
use crate::mail::{LogMailer, MailgunMailer, Mailer};
use crate::store::{DocumentStore, MemoryStore, PgDocumentStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub mailer: Arc<dyn Mailer>,
    pub links: Arc<dyn LinkMinter>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match config.store {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is required for the postgres store")?;
                let pg = PgDocumentStore::connect(url).await?;
                if let Err(e) = pg.migrate().await {
                    tracing::warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(pg) as Arc<dyn DocumentStore>
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new()) as Arc<dyn DocumentStore>
            }
        };

        let mailer = match (&config.mail, &config.mailgun) {
            (MailBackend::Mailgun, Some(mg)) => Arc::new(MailgunMailer::new(mg)) as Arc<dyn Mailer>,
            (MailBackend::Mailgun, None) => anyhow::bail!("mailgun backend selected without settings"),
            (MailBackend::Log, _) => Arc::new(LogMailer) as Arc<dyn Mailer>,
        };

        let links = Arc::new(JwtLinkMinter::new(&config.link)) as Arc<dyn LinkMinter>;

        Ok(Self::from_parts(config, store, mailer, links))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn DocumentStore>,
        mailer: Arc<dyn Mailer>,
        links: Arc<dyn LinkMinter>,
    ) -> Self {
        Self {
            config,
            store,
            mailer,
            links,
        }
    }

    #[cfg(test)]
    pub fn test_config() -> AppConfig {
        use crate::config::{LinkConfig, ReferralConfig};

        AppConfig {
            store: StoreBackend::Memory,
            database_url: None,
            mail: MailBackend::Log,
            mailgun: None,
            link: LinkConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                ttl_minutes: 5,
                return_url: "https://june.money/verify".into(),
            },
            referral: ReferralConfig::default(),
            site_url: "https://june.money/".into(),
            allowed_origins: vec!["http://localhost:3000".into()],
            listen_addr: ([127, 0, 0, 1], 0).into(),
        }
    }

    /// State over fresh in-memory fakes.
    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with(
            Arc::new(MemoryStore::new()),
            Arc::new(crate::mail::fake::RecordingMailer::default()),
        )
    }

    #[cfg(test)]
    pub fn fake_with(store: Arc<dyn DocumentStore>, mailer: Arc<dyn Mailer>) -> Self {
        let config = Arc::new(Self::test_config());
        let links = Arc::new(JwtLinkMinter::new(&config.link)) as Arc<dyn LinkMinter>;
        Self::from_parts(config, store, mailer, links)
    }
}
