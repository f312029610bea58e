//! Market Data Module
//!
//! Mock market-data provider whose lookups go through the cache's
//! memoization wrappers. Prices are generated deterministically per ticker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, Utc};
use tracing::info;

use crate::cache::{CacheCoordinator, CallArgs, Memoizer, SubjectMemoizer, TtlPolicy};
use crate::error::{CacheError, Result};
use crate::models::{validate_days, validate_ticker, PriceBar, Quote};

/// Invalidation category of quotes.
pub const QUOTE_CATEGORY: &str = "stock_price";

// == Market Data ==
/// Quote and history lookups, memoized through the shared coordinator.
#[derive(Debug)]
pub struct MarketData {
    quotes: SubjectMemoizer,
    history: Memoizer,
    /// Simulated upstream latency
    latency: Duration,
    /// Upstream fetches actually performed
    fetches: AtomicU64,
}

impl MarketData {
    /// Creates the provider and registers its quote key template.
    pub fn new(cache: Arc<CacheCoordinator>) -> Result<Self> {
        let quotes = Memoizer::for_subject(
            cache.clone(),
            QUOTE_CATEGORY,
            "stock_price_{subject}",
            TtlPolicy::ShortQuote,
        )?;
        let history = Memoizer::new(cache, "price_history", TtlPolicy::Technicals);

        Ok(Self {
            quotes,
            history,
            latency: Duration::ZERO,
            fetches: AtomicU64::new(0),
        })
    }

    /// Adds an artificial delay to every upstream fetch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of upstream fetches performed so far (cache misses).
    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    // == Quote ==
    /// Latest quote for `ticker`.
    pub async fn quote(&self, ticker: &str) -> Result<Quote> {
        if let Some(msg) = validate_ticker(ticker) {
            return Err(CacheError::InvalidRequest(msg));
        }
        self.quotes
            .call(ticker, || self.fetch_quote(ticker))
            .await
    }

    // == History ==
    /// `days` daily bars for `ticker`, oldest first.
    pub async fn history(&self, ticker: &str, days: u32) -> Result<Vec<PriceBar>> {
        if let Some(msg) = validate_ticker(ticker) {
            return Err(CacheError::InvalidRequest(msg));
        }
        if let Some(msg) = validate_days(days) {
            return Err(CacheError::InvalidRequest(msg));
        }

        let args = CallArgs::new().arg(ticker).kwarg("days", &days);
        self.history
            .call(args, || self.fetch_history(ticker, days))
            .await
    }

    // == Warm Up ==
    /// Pre-populates quotes for `tickers`, returning how many succeeded.
    pub async fn warm_up(&self, tickers: &[&str]) -> usize {
        let mut warmed = 0;
        for ticker in tickers {
            if self.quote(ticker).await.is_ok() {
                warmed += 1;
            }
        }
        info!(warmed, requested = tickers.len(), "Cache warm-up complete");
        warmed
    }

    async fn fetch_quote(&self, ticker: &str) -> Result<Quote> {
        self.upstream().await;

        let seed = ticker_seed(ticker);
        let price = base_price(seed);
        let change_percent = ((seed % 1000) as f64 / 100.0) - 5.0;
        let change = round2(price * change_percent / 100.0);

        Ok(Quote {
            ticker: ticker.to_string(),
            price,
            change,
            change_percent: round2(change_percent),
            volume: 1_000_000 + seed % 50_000_000,
            as_of: Utc::now().to_rfc3339(),
        })
    }

    async fn fetch_history(&self, ticker: &str, days: u32) -> Result<Vec<PriceBar>> {
        self.upstream().await;

        let seed = ticker_seed(ticker);
        let today = Utc::now().date_naive();
        let mut close = base_price(seed);
        let mut state = seed;

        let mut bars = Vec::with_capacity(days as usize);
        for offset in (0..days).rev() {
            let date = today
                .checked_sub_days(Days::new(u64::from(offset)))
                .ok_or_else(|| CacheError::Internal("date out of range".to_string()))?;

            state = next_state(state);
            let drift = ((state % 400) as f64 / 10_000.0) - 0.02;
            let open = close;
            close = round2((open * (1.0 + drift)).max(1.0));
            let spread = open.max(close) * ((state >> 8) % 200) as f64 / 10_000.0;

            bars.push(PriceBar {
                date: date.format("%Y-%m-%d").to_string(),
                open,
                high: round2(open.max(close) + spread),
                low: round2((open.min(close) - spread).max(0.01)),
                close,
                volume: 500_000 + (state >> 16) % 20_000_000,
            });
        }
        Ok(bars)
    }

    async fn upstream(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

/// FNV-1a over the ticker bytes.
fn ticker_seed(ticker: &str) -> u64 {
    ticker.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// xorshift step
fn next_state(mut x: u64) -> u64 {
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x
}

fn base_price(seed: u64) -> f64 {
    round2(20.0 + (seed % 48_000) as f64 / 100.0)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
