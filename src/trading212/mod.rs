//! Trading 212 web client history
//!
//! Order and dividend history is read from the same REST endpoints the web
//! client uses, authenticated with the browser session cookies. The full
//! history is refetched on every run and stored in the cache, where the
//! generate stages read it back.

pub mod models;

pub use models::{HistoryEntry, HistoryPage, Side, Transaction, TransactionKind};

use anyhow::{Context, Result};
use reqwest::header::COOKIE;
use reqwest::{Client, Url};
use tracing::info;

use crate::cache::{Cache, CacheKey, PurgePolicy};
use crate::error::PipelineError;
use crate::paginate;

const PROVIDER: &str = "trading212";
const CACHE_NAMESPACE: &str = "trading212";
const CACHE_GROUP: &str = "history";

/// Cookies the history endpoints refuse to work without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredCookie {
    CustomerSession,
    LoginToken,
    SessionId,
    UserEmail,
}

impl RequiredCookie {
    pub const ALL: [RequiredCookie; 4] = [
        Self::CustomerSession,
        Self::LoginToken,
        Self::SessionId,
        Self::UserEmail,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::CustomerSession => "CUSTOMER_SESSION",
            Self::LoginToken => "LOGIN_TOKEN",
            Self::SessionId => "TRADING212_SESSION_LIVE",
            Self::UserEmail => "USER_EMAIL",
        }
    }
}

/// Authenticated web session, reduced to the cookies we forward.
#[derive(Debug, Clone)]
pub struct Session {
    cookies: Vec<(RequiredCookie, String)>,
}

impl Session {
    /// Parse a raw `Cookie` header (`a=1; b=2`) copied from a logged-in browser.
    pub fn from_cookie_header(header: &str) -> Result<Self> {
        let pairs: Vec<(&str, &str)> = header
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .map(|(name, value)| (name.trim(), value.trim()))
            .collect();

        let mut cookies = Vec::with_capacity(RequiredCookie::ALL.len());
        for required in RequiredCookie::ALL {
            let value = pairs
                .iter()
                .find(|(name, value)| *name == required.name() && !value.is_empty())
                .map(|(_, value)| value.to_string())
                .ok_or_else(|| PipelineError::MissingCookie(required.name().to_string()))?;
            cookies.push((required, value));
        }

        Ok(Self { cookies })
    }

    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(cookie, value)| format!("{}={}", cookie.name(), value))
            .collect::<Vec<_>>()
            .join(";")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    Orders,
    Dividends,
}

impl HistoryKind {
    fn endpoint(self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Dividends => "dividends",
        }
    }

    pub fn cache_key(self) -> CacheKey {
        CacheKey::new(
            CACHE_NAMESPACE,
            CACHE_GROUP,
            &format!("{}.json", self.endpoint()),
        )
    }
}

pub struct Trading212Client {
    http: Client,
    base_url: String,
    session: Session,
    max_pages: usize,
}

impl Trading212Client {
    pub fn new(http: Client, base_url: &str, session: Session, max_pages: usize) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            max_pages,
        }
    }

    /// Every page of `kind`, newest first.
    pub async fn fetch_history(&self, kind: HistoryKind) -> Result<Vec<HistoryEntry>> {
        info!("Fetching {} history from Trading 212", kind.endpoint());
        let entries = paginate::fetch_all(
            self.max_pages,
            |entry: &HistoryEntry| entry.date.clone(),
            |older_than| self.fetch_page(kind, older_than),
        )
        .await
        .with_context(|| format!("Unable to acquire {}", kind.endpoint()))?;
        info!("Fetched {} {} entries", entries.len(), kind.endpoint());
        Ok(entries)
    }

    async fn fetch_page(
        &self,
        kind: HistoryKind,
        older_than: Option<String>,
    ) -> Result<paginate::Page<HistoryEntry>> {
        let endpoint = format!("{}/rest/history/{}", self.base_url, kind.endpoint());
        let url = match older_than {
            Some(cursor) => Url::parse_with_params(&endpoint, &[("olderThan", cursor)])?,
            None => Url::parse(&endpoint)?,
        };

        let response = self
            .http
            .get(url)
            .header(COOKIE, self.session.cookie_header())
            .send()
            .await
            .context("Failed to send request to Trading 212")?;

        if !response.status().is_success() {
            return Err(PipelineError::http(PROVIDER, response.status()).into());
        }

        let page: HistoryPage = response
            .json()
            .await
            .context("Failed to parse Trading 212 history page")?;
        Ok(page.into())
    }
}

/// Persist fetched history for the generate stages.
pub fn store_history(cache: &Cache, kind: HistoryKind, entries: &[HistoryEntry]) -> Result<()> {
    cache.write_json(&kind.cache_key(), entries, PurgePolicy::Never)
}

/// History previously stored by `fetch`.
pub fn cached_history(cache: &Cache, kind: HistoryKind) -> Result<Vec<HistoryEntry>> {
    cache.read_json(&kind.cache_key()).ok_or_else(|| {
        anyhow::anyhow!(
            "No cached {} history at {}; run `divtrack fetch` first",
            kind.endpoint(),
            kind.cache_key().path()
        )
    })
}
