//! Core types for the on-chain prediction market client
//!
//! This crate defines the shared data structures used across the workspace:
//! market snapshots, user positions, probability samples and the error
//! taxonomy for contract reads and writes.

pub mod error;
pub mod market;
pub mod position;
pub mod serde_ext;

pub use error::{ReadError, ReadResult, WriteError};
pub use market::{
    Market, MarketBoard, MarketFacts, MarketProbability, MarketStage, Outcome,
};
pub use position::{Holding, MarketPosition, Portfolio};
