//! Swing Sniper Core: domain types, market data, indicators, screening.
//!
//! This crate contains the deterministic part of the screener:
//! - Domain types (bars, fundamental snapshots, universe rows)
//! - Market data provider trait with Yahoo, CSV-directory and synthetic sources
//! - Rolling indicators (SMA, prior-window channel)
//! - Screening evaluators (technical template, fundamentals, relative strength,
//!   position sizing, earnings risk) and the per-symbol `Screener`

pub mod data;
pub mod domain;
pub mod indicators;
pub mod screen;
