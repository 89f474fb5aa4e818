//! Payout tracking — payouts ranked by amount plus a status breakdown.

use crate::pipeline::Section;
use influencer_core::{DashboardError, DashboardResult, Payout, PayoutStatus, Table};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}

/// Amounts per status. Only the exact strings `"pending"` and `"paid"` are
/// summed; any other spelling (including `"Paid"`) lands in neither bucket
/// but still shows up in `distribution`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub pending_amount: f64,
    pub paid_amount: f64,
    /// Row count per distinct status, most frequent first.
    pub distribution: Vec<StatusCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutSummary {
    /// Header of the payouts file, in source order.
    pub columns: Vec<String>,
    /// Payouts by descending `total_payout`; rows without an amount go last.
    pub rows: Vec<Payout>,
    /// `None` when the payouts file carries no `status` column.
    pub status: Option<StatusBreakdown>,
}

impl PayoutSummary {
    pub fn total(&self) -> f64 {
        self.rows.iter().filter_map(|p| p.total_payout).sum()
    }
}

fn by_amount_desc(a: &Payout, b: &Payout) -> Ordering {
    match (a.total_payout, b.total_payout) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn status_breakdown(payouts: &[Payout]) -> StatusBreakdown {
    let amount_for = |wanted: &PayoutStatus| -> f64 {
        payouts
            .iter()
            .filter(|p| p.status.as_ref() == Some(wanted))
            .filter_map(|p| p.total_payout)
            .sum()
    };

    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for status in payouts.iter().filter_map(|p| p.status.as_ref()) {
        let counter = counts.entry(status.as_str()).or_insert_with(|| {
            order.push(status.as_str());
            0
        });
        *counter += 1;
    }
    let mut distribution: Vec<StatusCount> = order
        .into_iter()
        .map(|s| StatusCount {
            status: s.to_string(),
            count: counts[s],
        })
        .collect();
    distribution.sort_by(|a, b| b.count.cmp(&a.count));

    StatusBreakdown {
        pending_amount: amount_for(&PayoutStatus::Pending),
        paid_amount: amount_for(&PayoutStatus::Paid),
        distribution,
    }
}

/// Rank payouts and break them down by status. No join is involved.
pub fn payout_summary(payouts: &Table<Payout>) -> DashboardResult<Section<PayoutSummary>> {
    if payouts.is_empty() {
        return Ok(Section::unavailable("No payout data available"));
    }
    if !payouts.has_column("total_payout") {
        return Err(DashboardError::missing_column("payouts data", "total_payout"));
    }

    let mut rows = payouts.rows.clone();
    rows.sort_by(by_amount_desc);

    let status = payouts
        .has_column("status")
        .then(|| status_breakdown(&payouts.rows));

    debug!(payouts = rows.len(), "Payout summary computed");
    Ok(Section::Available(PayoutSummary {
        columns: payouts.columns.clone(),
        rows,
        status,
    }))
}
