//! SOL/USD price oracle.
//!
//! One cached rate with a fixed freshness window. The cache is an explicit
//! object with injected fetch and clock seams - concurrent readers observe
//! either the old snapshot or the new one, never a half-written value, and
//! tests drive staleness with a fake clock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// How long a fetched rate stays fresh, and the default background
/// refresh interval.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(60);

/// Errors from rate retrieval.
#[derive(Debug, thiserror::Error)]
pub enum RateError {
    /// No live rate and no cached fallback.
    #[error("exchange rate unavailable")]
    Unavailable,

    /// Upstream request failed.
    #[error("rate fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with something we couldn't parse.
    #[error("malformed rate response: {0}")]
    Malformed(String),
}

/// Upstream source of the fiat-per-SOL exchange rate.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// One upstream round trip for the current rate.
    async fn fetch_rate(&self) -> Result<Decimal, RateError>;
}

/// Clock seam so freshness is testable without waiting.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// CoinGecko simple-price endpoint as a [`RateSource`].
pub struct CoinGeckoSource {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SimplePrice {
    solana: SolanaPrice,
}

#[derive(Debug, Deserialize)]
struct SolanaPrice {
    usd: f64,
}

impl CoinGeckoSource {
    /// Create a source against the given API base URL
    /// (`https://api.coingecko.com/api/v3` in production).
    ///
    /// # Errors
    ///
    /// Returns [`RateError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, RateError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl RateSource for CoinGeckoSource {
    async fn fetch_rate(&self) -> Result<Decimal, RateError> {
        let url = format!(
            "{}/simple/price?ids=solana&vs_currencies=usd",
            self.base_url
        );

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let body: SimplePrice = response.json().await?;

        let rate = Decimal::from_f64(body.solana.usd)
            .ok_or_else(|| RateError::Malformed(format!("bad price value {}", body.solana.usd)))?;

        if rate <= Decimal::ZERO {
            return Err(RateError::Malformed(format!("non-positive rate {rate}")));
        }

        Ok(rate)
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedRate {
    rate: Decimal,
    fetched_at: Instant,
}

/// Caching price oracle.
///
/// `rate()` never blocks longer than one upstream round trip; callers set
/// the retry cadence, normally via [`PriceOracle::spawn_refresh_task`].
pub struct PriceOracle {
    source: Arc<dyn RateSource>,
    clock: Arc<dyn Clock>,
    freshness: Duration,
    cache: RwLock<Option<CachedRate>>,
}

impl PriceOracle {
    /// Create an oracle with the system clock and the default freshness
    /// window.
    #[must_use]
    pub fn new(source: Arc<dyn RateSource>) -> Self {
        Self::with_clock(source, Arc::new(SystemClock), FRESHNESS_WINDOW)
    }

    /// Create an oracle with an explicit clock and freshness window.
    #[must_use]
    pub fn with_clock(
        source: Arc<dyn RateSource>,
        clock: Arc<dyn Clock>,
        freshness: Duration,
    ) -> Self {
        Self {
            source,
            clock,
            freshness,
            cache: RwLock::new(None),
        }
    }

    /// The current fiat-per-SOL rate.
    ///
    /// A fresh cached value is returned without touching upstream. A stale
    /// or absent cache triggers exactly one upstream fetch; if that fails,
    /// the last known value is served instead.
    ///
    /// # Errors
    ///
    /// Returns [`RateError::Unavailable`] only when the fetch fails and
    /// nothing was ever cached.
    #[instrument(skip(self))]
    pub async fn rate(&self) -> Result<Decimal, RateError> {
        let now = self.clock.now();

        if let Some(cached) = *self.cache.read().await
            && now.duration_since(cached.fetched_at) < self.freshness
        {
            debug!("serving fresh cached rate");
            return Ok(cached.rate);
        }

        match self.source.fetch_rate().await {
            Ok(rate) => {
                // Single write swaps the whole snapshot; readers see either
                // the previous value or this one.
                *self.cache.write().await = Some(CachedRate {
                    rate,
                    fetched_at: now,
                });
                Ok(rate)
            }
            Err(err) => {
                warn!(error = %err, "rate fetch failed");
                match *self.cache.read().await {
                    Some(cached) => {
                        debug!("serving stale cached rate after fetch failure");
                        Ok(cached.rate)
                    }
                    None => Err(RateError::Unavailable),
                }
            }
        }
    }

    /// Force one upstream fetch, updating the cache on success.
    ///
    /// # Errors
    ///
    /// Propagates the source's error; the cache keeps its previous value.
    pub async fn refresh(&self) -> Result<Decimal, RateError> {
        let rate = self.source.fetch_rate().await?;
        *self.cache.write().await = Some(CachedRate {
            rate,
            fetched_at: self.clock.now(),
        });
        Ok(rate)
    }

    /// Spawn the periodic background refresh (interval = freshness
    /// window). A refresh never disturbs quotes already captured - they
    /// are value snapshots. Abort the returned handle to stop.
    pub fn spawn_refresh_task(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.freshness);
            // First tick fires immediately; prime the cache with it.
            loop {
                ticker.tick().await;
                if let Err(err) = self.refresh().await {
                    warn!(error = %err, "background rate refresh failed");
                }
            }
        })
    }
}
