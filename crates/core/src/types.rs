use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A loaded tabular dataset: the header names as they appeared in the source
/// file plus the typed rows. Column presence is answered from `columns`,
/// never inferred from row values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table<T> {
    pub columns: Vec<String>,
    pub rows: Vec<T>,
}

impl<T> Table<T> {
    pub fn new(columns: Vec<String>, rows: Vec<T>) -> Self {
        Self { columns, rows }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.rows.iter()
    }
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }
}

// ─── Influencers ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Influencer {
    pub influencer_id: Option<String>,
    pub name: Option<String>,
    pub username: Option<String>,
    pub platform: Option<String>,
    pub category: Option<String>,
    pub follower_count: Option<u64>,
    /// Fraction in `[0, 1]`.
    pub engagement_rate: Option<f64>,
}

impl Influencer {
    pub const UNKNOWN_HANDLE: &'static str = "Unknown";

    /// `username` when present, otherwise `name`.
    pub fn display_name(&self) -> Option<&str> {
        self.username.as_deref().or(self.name.as_deref())
    }

    pub fn handle(&self) -> &str {
        self.display_name().unwrap_or(Self::UNKNOWN_HANDLE)
    }

    pub fn followers(&self) -> u64 {
        self.follower_count.unwrap_or(0)
    }
}

/// Which influencer column supplies display names for a table: `username`
/// wins over `name` when the file carries both.
pub fn name_column(influencers: &Table<Influencer>) -> Option<&'static str> {
    if influencers.has_column("username") {
        Some("username")
    } else if influencers.has_column("name") {
        Some("name")
    } else {
        None
    }
}

// ─── Posts ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub post_id: Option<String>,
    pub influencer_id: Option<String>,
    pub platform: Option<String>,
    /// Unparsable values are `None`.
    pub date: Option<NaiveDate>,
    /// Every other column of the source row (reach, likes, caption, ...).
    pub metadata: BTreeMap<String, String>,
}

// ─── Tracking ───────────────────────────────────────────────────────────────

/// One trackable campaign event; the grain every aggregate is computed over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingRecord {
    pub influencer_id: Option<String>,
    pub revenue: Option<f64>,
    pub orders: Option<u64>,
    /// Parsed from `date`, or `campaign_date` when `date` is absent.
    /// Unparsable values are `None` and never match a date range.
    pub date: Option<NaiveDate>,
}

impl TrackingRecord {
    pub fn revenue_or_zero(&self) -> f64 {
        self.revenue.unwrap_or(0.0)
    }

    pub fn orders_or_zero(&self) -> u64 {
        self.orders.unwrap_or(0)
    }
}

// ─── Payouts ────────────────────────────────────────────────────────────────

/// Payout state. Matching is exact and case-sensitive: only `"pending"` and
/// `"paid"` map to the named variants; `"Paid"` is `Other("Paid")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PayoutStatus {
    Pending,
    Paid,
    Other(String),
}

impl PayoutStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for PayoutStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => Self::Pending,
            "paid" => Self::Paid,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for PayoutStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<PayoutStatus> for String {
    fn from(status: PayoutStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub influencer_id: Option<String>,
    pub total_payout: Option<f64>,
    pub status: Option<PayoutStatus>,
    /// Non-null cells of every other column (basis, rate, ...), keyed by
    /// header. The table's `columns` keep the source order.
    pub extra: BTreeMap<String, String>,
}

impl Payout {
    /// Cell text for any source column; `None` for null cells.
    pub fn cell(&self, column: &str) -> Option<String> {
        match column {
            "influencer_id" => self.influencer_id.clone(),
            "total_payout" => self.total_payout.map(|v| v.to_string()),
            "status" => self.status.as_ref().map(|s| s.to_string()),
            other => self.extra.get(other).cloned(),
        }
    }
}
