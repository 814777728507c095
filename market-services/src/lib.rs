//! Market services for the on-chain prediction market client
//!
//! This crate turns typed contract reads into UI-ready state:
//! - [`MarketAggregator`] builds a [`MarketBoard`](market_core::MarketBoard)
//!   from the market maker and conditional tokens, degrading to placeholder
//!   data when any read fails
//! - [`MarketWatcher`] schedules refreshes and keeps the last good snapshot
//! - [`PortfolioReader`] derives account positions from token balances
//! - [`view`] formats everything for display

pub mod admin;
pub mod aggregator;
pub mod clock;
pub mod config;
pub mod fallback;
pub mod portfolio;
pub mod price;
pub mod resolution;
pub mod series;
pub mod store;
pub mod view;
pub mod watcher;

pub use admin::{AdminError, AdminService};
pub use aggregator::{
    AggregatorSettings, FallbackReason, MarketAggregator, MarketMetadata, Provenance, ReadContext,
    Refresh, RefreshInputs,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, ServiceConfig};
pub use fallback::FallbackProvider;
pub use portfolio::{PortfolioRead, PortfolioReader, TokenBalance};
pub use price::{normalize_price, PRICE_SCALE};
pub use resolution::{detect_resolution, ConditionState, Resolution, MAX_OUTCOME_SLOTS};
pub use series::ProbabilityHistory;
pub use store::{ApplyOutcome, Snapshot, SnapshotStore, Ticket};
pub use view::{MarketDetailView, MarketView, PositionView};
pub use watcher::{MarketWatcher, RefreshRequest, WatcherError};
