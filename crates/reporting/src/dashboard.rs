//! Influencer campaign dashboard — one explicit render per filter change.

use crate::filter::{self, DateRange, FilterOptions, FilterSelection};
use crate::loader::DataContext;
use crate::payouts::{self, PayoutSummary};
use crate::pipeline::{self, CampaignRow, CampaignSummary, RoasRow, RoasSummary, Section};
use chrono::{DateTime, Utc};
use influencer_core::config::ViewConfig;
use influencer_core::Influencer;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMetrics {
    pub total_influencers: usize,
    /// Sum of follower counts; `None` when the data has no `follower_count`.
    pub total_reach: Option<u64>,
    pub total_revenue: f64,
    pub total_orders: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluencerCard {
    pub influencer_id: Option<String>,
    pub handle: String,
    pub platform: String,
    pub category: String,
    pub followers: u64,
    pub engagement_rate: Option<f64>,
}

impl InfluencerCard {
    pub const NOT_AVAILABLE: &'static str = "N/A";

    fn from_influencer(inf: &Influencer) -> Self {
        Self {
            influencer_id: inf.influencer_id.clone(),
            handle: inf.handle().to_string(),
            platform: inf
                .platform
                .clone()
                .unwrap_or_else(|| Self::NOT_AVAILABLE.to_string()),
            category: inf
                .category
                .clone()
                .unwrap_or_else(|| Self::NOT_AVAILABLE.to_string()),
            followers: inf.followers(),
            engagement_rate: inf.engagement_rate,
        }
    }
}

/// Everything the presentation layer needs for one render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub filters: FilterSelection,
    pub options: FilterOptions,
    /// The date range actually applied, after clamping.
    pub applied_date_range: Option<DateRange>,
    pub metrics: KeyMetrics,
    pub top_influencers: Vec<InfluencerCard>,
    pub roas: Section<RoasSummary>,
    pub campaign: Section<CampaignSummary>,
    pub payouts: Section<PayoutSummary>,
    pub warnings: Vec<String>,
    pub top_n: usize,
    pub generated_at: DateTime<Utc>,
}

impl DashboardView {
    /// ROAS leaderboard rows shown in the chart and table.
    pub fn roas_leaderboard(&self) -> &[RoasRow] {
        match self.roas.available() {
            Some(summary) => summary.top(self.top_n),
            None => &[],
        }
    }

    pub fn campaign_leaderboard(&self) -> &[CampaignRow] {
        match self.campaign.available() {
            Some(summary) => summary.top(self.top_n),
            None => &[],
        }
    }
}

fn top_influencers(filtered: &[&Influencer], by_followers: bool, n: usize) -> Vec<InfluencerCard> {
    let mut ranked: Vec<&Influencer> = filtered.to_vec();
    if by_followers {
        ranked.sort_by(|a, b| b.followers().cmp(&a.followers()));
    }
    ranked
        .into_iter()
        .take(n)
        .map(InfluencerCard::from_influencer)
        .collect()
}

/// Counts pin at `u64::MAX` instead of overflowing.
fn saturating_total(values: impl Iterator<Item = u64>) -> u64 {
    values.fold(0, u64::saturating_add)
}

/// Recompute the whole dashboard from the base tables and a filter selection.
/// Nothing is cached between renders.
pub fn render(data: &DataContext, selection: &FilterSelection, view: &ViewConfig) -> DashboardView {
    let filtered = filter::apply(data, selection);
    let mut warnings = filtered.warnings.clone();

    let has_followers = data.influencers.has_column("follower_count");
    let metrics = KeyMetrics {
        total_influencers: filtered.influencers.len(),
        total_reach: has_followers.then(|| {
            saturating_total(filtered.influencers.iter().map(|i| i.followers()))
        }),
        total_revenue: filtered.tracking.iter().map(|t| t.revenue_or_zero()).sum(),
        total_orders: saturating_total(filtered.tracking.iter().map(|t| t.orders_or_zero())),
    };

    let roas = Section::from_result(
        "roas",
        pipeline::roas_summary(
            &data.tracking,
            &filtered.tracking,
            &data.influencers,
            &data.posts,
        ),
    );
    let campaign = Section::from_result(
        "campaign",
        pipeline::campaign_summary(&data.tracking, &filtered.tracking, &data.influencers),
    );
    let payouts = Section::from_result("payouts", payouts::payout_summary(&data.payouts));

    for (name, reason) in [
        ("ROAS", unavailable_reason(&roas)),
        ("Revenue and orders", unavailable_reason(&campaign)),
        ("Payouts", unavailable_reason(&payouts)),
    ] {
        if let Some(reason) = reason {
            warnings.push(format!("{name}: {reason}"));
        }
    }

    info!(
        influencers = metrics.total_influencers,
        tracking = filtered.tracking.len(),
        warnings = warnings.len(),
        "Dashboard rendered"
    );

    DashboardView {
        filters: selection.clone(),
        options: filter::filter_options(data),
        applied_date_range: filtered.date_range,
        top_influencers: top_influencers(&filtered.influencers, has_followers, view.top_n),
        metrics,
        roas,
        campaign,
        payouts,
        warnings,
        top_n: view.top_n,
        generated_at: Utc::now(),
    }
}

fn unavailable_reason<T>(section: &Section<T>) -> Option<&str> {
    match section {
        Section::Available(_) => None,
        Section::Unavailable { reason } => Some(reason.as_str()),
    }
}
