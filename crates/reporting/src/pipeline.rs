//! Join-aggregate pipeline: tracking ⟕ influencers ⟕ posts, per-row cost and
//! ROAS, and the per-influencer ROAS and revenue/orders leaderboards.

use influencer_core::{
    name_column, DashboardError, DashboardResult, Influencer, Post, Table, TrackingRecord,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Attributed cost of a single order.
pub const FIXED_COST_PER_ORDER: f64 = 100.0;

const REQUIRED_TRACKING_COLUMNS: [&str; 3] = ["influencer_id", "revenue", "orders"];

// ─── Sections ───────────────────────────────────────────────────────────────

/// A dashboard section that is either computed or skipped with a reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Section<T> {
    Available(T),
    Unavailable { reason: String },
}

impl<T> Section<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn available(&self) -> Option<&T> {
        match self {
            Self::Available(v) => Some(v),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// Turn a pipeline error into an unavailable section, logging it.
    pub fn from_result(section: &str, result: DashboardResult<Section<T>>) -> Self {
        match result {
            Ok(s) => s,
            Err(e) => {
                warn!(section, error = %e, "Section skipped");
                Self::unavailable(e.to_string())
            }
        }
    }
}

// ─── Cost / ROAS ────────────────────────────────────────────────────────────

pub fn cost_for(orders: u64) -> f64 {
    orders as f64 * FIXED_COST_PER_ORDER
}

/// `revenue / cost`, or `0.0` when there is no cost to divide by.
pub fn roas_for(revenue: f64, cost: f64) -> f64 {
    if cost > 0.0 {
        revenue / cost
    } else {
        0.0
    }
}

// ─── Join ───────────────────────────────────────────────────────────────────

/// One row of the joined fact table. Right-hand sides are `None` when the
/// left join found no match.
#[derive(Debug, Clone, Copy)]
pub struct JoinedRow<'a> {
    pub tracking: &'a TrackingRecord,
    pub influencer: Option<&'a Influencer>,
    pub post: Option<&'a Post>,
}

impl JoinedRow<'_> {
    pub fn cost(&self) -> f64 {
        cost_for(self.tracking.orders_or_zero())
    }

    /// `None` when revenue is null on a row that carries a cost; such rows
    /// are left out of the per-influencer mean.
    pub fn roas(&self) -> Option<f64> {
        let cost = self.cost();
        match self.tracking.revenue {
            None if cost > 0.0 => None,
            revenue => Some(roas_for(revenue.unwrap_or(0.0), cost)),
        }
    }
}

fn index_by_id<'a, T>(
    rows: &'a [T],
    key: impl Fn(&T) -> Option<&str>,
) -> HashMap<&'a str, Vec<&'a T>> {
    let mut index: HashMap<&str, Vec<&T>> = HashMap::new();
    for row in rows {
        if let Some(id) = key(row) {
            index.entry(id).or_default().push(row);
        }
    }
    index
}

/// Left-join tracking to influencers, then to posts, on `influencer_id`.
///
/// Every tracking row survives. Multiple matching influencers or posts fan
/// the row out, in input order. An empty posts table is not joined at all.
pub fn join<'a>(
    tracking: &[&'a TrackingRecord],
    influencers: &'a Table<Influencer>,
    posts: &'a Table<Post>,
) -> DashboardResult<Vec<JoinedRow<'a>>> {
    if !influencers.has_column("influencer_id") {
        return Err(DashboardError::JoinOrAggregation(
            "influencers data has no 'influencer_id' column to join on".into(),
        ));
    }
    let join_posts = !posts.is_empty();
    if join_posts && !posts.has_column("influencer_id") {
        return Err(DashboardError::JoinOrAggregation(
            "posts data has no 'influencer_id' column to join on".into(),
        ));
    }

    let by_influencer = index_by_id(&influencers.rows, |i| i.influencer_id.as_deref());
    let by_post = index_by_id(&posts.rows, |p| p.influencer_id.as_deref());

    let mut joined = Vec::with_capacity(tracking.len());
    for &record in tracking {
        let id = record.influencer_id.as_deref();
        let influencer_matches: Vec<Option<&Influencer>> =
            match id.and_then(|id| by_influencer.get(id)) {
                Some(found) => found.iter().map(|i| Some(*i)).collect(),
                None => vec![None],
            };
        let post_matches: Vec<Option<&Post>> = match id.and_then(|id| by_post.get(id)) {
            Some(found) if join_posts => found.iter().map(|p| Some(*p)).collect(),
            _ => vec![None],
        };

        for influencer in &influencer_matches {
            for post in &post_matches {
                joined.push(JoinedRow {
                    tracking: record,
                    influencer: *influencer,
                    post: *post,
                });
            }
        }
    }

    debug!(
        tracking = tracking.len(),
        joined = joined.len(),
        "Tracking joined to influencers and posts"
    );
    Ok(joined)
}

// ─── Summaries ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoasRow {
    pub influencer_id: String,
    /// Mean of the per-row ROAS over the joined rows of this influencer;
    /// `None` when no row had a usable revenue.
    #[serde(rename = "ROAS")]
    pub roas: Option<f64>,
    pub revenue: f64,
    pub orders: u64,
    pub name: Option<String>,
}

/// ROAS leaderboard, sorted by descending mean ROAS. When the influencer
/// data has a name column, only ids known to it are listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoasSummary {
    /// The influencer column names were taken from (`username` or `name`).
    pub name_column: Option<String>,
    pub rows: Vec<RoasRow>,
}

impl RoasSummary {
    pub fn top(&self, n: usize) -> &[RoasRow] {
        &self.rows[..n.min(self.rows.len())]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRow {
    pub influencer_id: String,
    pub orders: u64,
    pub revenue: f64,
    pub name: Option<String>,
}

/// Revenue/orders leaderboard, sorted by descending revenue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub name_column: Option<String>,
    pub rows: Vec<CampaignRow>,
}

impl CampaignSummary {
    pub fn top(&self, n: usize) -> &[CampaignRow] {
        &self.rows[..n.min(self.rows.len())]
    }
}

#[derive(Default)]
struct Totals {
    roas_sum: f64,
    roas_rows: u64,
    revenue: f64,
    orders: u64,
}

impl Totals {
    fn add(&mut self, record: &TrackingRecord, roas: Option<f64>) -> DashboardResult<()> {
        if let Some(roas) = roas {
            self.roas_sum += roas;
            self.roas_rows += 1;
        }
        self.revenue += record.revenue_or_zero();
        self.orders = self
            .orders
            .checked_add(record.orders_or_zero())
            .ok_or_else(|| DashboardError::JoinOrAggregation("orders total overflowed".into()))?;
        Ok(())
    }

    fn mean_roas(&self) -> Option<f64> {
        (self.roas_rows > 0).then(|| self.roas_sum / self.roas_rows as f64)
    }
}

/// Descending, with missing values last.
fn by_roas_desc(a: &RoasRow, b: &RoasRow) -> Ordering {
    match (a.roas, b.roas) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn require_tracking_columns(tracking: &Table<TrackingRecord>) -> DashboardResult<()> {
    match REQUIRED_TRACKING_COLUMNS
        .iter()
        .find(|c| !tracking.has_column(c))
    {
        Some(column) => Err(DashboardError::missing_column("tracking data", *column)),
        None => Ok(()),
    }
}

/// First influencer per id, for attaching display names.
fn names_by_id(influencers: &Table<Influencer>) -> HashMap<&str, Option<&str>> {
    let mut names = HashMap::new();
    for inf in influencers.iter() {
        if let Some(id) = inf.influencer_id.as_deref() {
            names.entry(id).or_insert_with(|| inf.display_name());
        }
    }
    names
}

/// Build the ROAS leaderboard from the scoped tracking rows.
///
/// Rows without an `influencer_id` take part in the join but not in the
/// grouping. Groups are keyed in id order before the stable sort, so the
/// output does not depend on input row order.
pub fn roas_summary(
    tracking_table: &Table<TrackingRecord>,
    tracking: &[&TrackingRecord],
    influencers: &Table<Influencer>,
    posts: &Table<Post>,
) -> DashboardResult<Section<RoasSummary>> {
    if let Err(e) = require_tracking_columns(tracking_table) {
        return Ok(Section::unavailable(format!(
            "Revenue or orders data not available for ROAS calculation: {e}"
        )));
    }
    if tracking.is_empty() {
        return Ok(Section::unavailable("No data available for ROAS calculation"));
    }

    let joined = join(tracking, influencers, posts)?;

    let mut groups: BTreeMap<&str, Totals> = BTreeMap::new();
    for row in &joined {
        if let Some(id) = row.tracking.influencer_id.as_deref() {
            groups.entry(id).or_default().add(row.tracking, row.roas())?;
        }
    }

    // Names attach by inner join: with a name column, unknown ids drop out.
    let name_column = name_column(influencers);
    let names = names_by_id(influencers);
    let mut rows: Vec<RoasRow> = groups
        .into_iter()
        .filter(|(id, _)| name_column.is_none() || names.contains_key(id))
        .map(|(id, t)| RoasRow {
            influencer_id: id.to_string(),
            roas: t.mean_roas(),
            revenue: t.revenue,
            orders: t.orders,
            name: names.get(id).copied().flatten().map(String::from),
        })
        .collect();
    rows.sort_by(by_roas_desc);

    if rows.is_empty() {
        return Ok(Section::unavailable(
            "No tracked influencer matches the influencer data",
        ));
    }

    debug!(influencers = rows.len(), "ROAS summary computed");
    Ok(Section::Available(RoasSummary {
        name_column: name_column.map(String::from),
        rows,
    }))
}

/// Build the revenue/orders leaderboard. No join with posts, so there is no
/// fan-out here.
pub fn campaign_summary(
    tracking_table: &Table<TrackingRecord>,
    tracking: &[&TrackingRecord],
    influencers: &Table<Influencer>,
) -> DashboardResult<Section<CampaignSummary>> {
    if let Err(e) = require_tracking_columns(tracking_table) {
        return Ok(Section::unavailable(format!(
            "Revenue or orders data not available: {e}"
        )));
    }
    if tracking.is_empty() {
        return Ok(Section::unavailable("No tracking data available"));
    }

    let mut groups: BTreeMap<&str, Totals> = BTreeMap::new();
    for record in tracking {
        if let Some(id) = record.influencer_id.as_deref() {
            groups.entry(id).or_default().add(record, None)?;
        }
    }

    let names = names_by_id(influencers);
    let mut rows: Vec<CampaignRow> = groups
        .into_iter()
        .map(|(id, t)| CampaignRow {
            influencer_id: id.to_string(),
            orders: t.orders,
            revenue: t.revenue,
            name: names.get(id).copied().flatten().map(String::from),
        })
        .collect();
    rows.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));

    debug!(influencers = rows.len(), "Campaign summary computed");
    Ok(Section::Available(CampaignSummary {
        name_column: name_column(influencers).map(String::from),
        rows,
    }))
}
