//! Influencer campaign reporting: dataset loading, filtering, the
//! tracking/influencer/post join, ROAS and revenue leaderboards, payout
//! tracking, and CSV export.

pub mod dashboard;
pub mod export;
pub mod filter;
pub mod loader;
pub mod payouts;
pub mod pipeline;

pub use dashboard::{render, DashboardView};
pub use filter::{DateRange, FilterSelection, Selection};
pub use loader::{load_dataset, DataCache, DataContext};
pub use pipeline::{Section, FIXED_COST_PER_ORDER};
