//! Filter engine — platform/category selection over influencers and a date
//! range over tracking events.

use crate::loader::DataContext;
use chrono::NaiveDate;
use influencer_core::{Influencer, Table, TrackingRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

// ─── Selections ─────────────────────────────────────────────────────────────

/// Values selected for one filterable column.
///
/// `All` applies no filtering. `Only` keeps rows whose value is in the set,
/// so an empty `Only` passes nothing. A selection on a column the data does
/// not carry is ignored either way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl Selection {
    pub fn only<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(values.into_iter().map(Into::into).collect())
    }

    /// A cleared selection: nothing passes.
    pub fn none() -> Self {
        Self::Only(BTreeSet::new())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => value.is_some_and(|v| set.contains(v)),
        }
    }
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Bounds given in either order are normalized so `start <= end`.
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// Null dates never fall inside a range.
    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        date.is_some_and(|d| d >= self.start && d <= self.end)
    }

    /// Intersect with the observed bounds; `None` when the two do not overlap.
    pub fn clamp_to(&self, bounds: &DateRange) -> Option<DateRange> {
        let start = self.start.max(bounds.start);
        let end = self.end.min(bounds.end);
        (start <= end).then_some(DateRange { start, end })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    #[serde(default)]
    pub platforms: Selection,
    #[serde(default)]
    pub categories: Selection,
    #[serde(default)]
    pub date_range: Option<DateRange>,
}

impl FilterSelection {
    /// No filtering on any column.
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether the influencer predicates remove anything for this table.
    pub fn narrows(&self, influencers: &Table<Influencer>) -> bool {
        (!self.platforms.is_all() && influencers.has_column("platform"))
            || (!self.categories.is_all() && influencers.has_column("category"))
    }
}

// ─── Options ────────────────────────────────────────────────────────────────

/// Choices a host UI offers for each control.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Distinct non-null platforms in first-seen order; `None` if the column is absent.
    pub platforms: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
    /// Observed `[min, max]` of tracking dates.
    pub date_bounds: Option<DateRange>,
}

pub fn filter_options(data: &DataContext) -> FilterOptions {
    let distinct = |column: &str, get: fn(&Influencer) -> Option<&str>| -> Option<Vec<String>> {
        if !data.influencers.has_column(column) {
            return None;
        }
        let mut seen = HashSet::new();
        Some(
            data.influencers
                .iter()
                .filter_map(get)
                .filter(|v| seen.insert(*v))
                .map(String::from)
                .collect(),
        )
    };

    FilterOptions {
        platforms: distinct("platform", |i| i.platform.as_deref()),
        categories: distinct("category", |i| i.category.as_deref()),
        date_bounds: date_bounds(&data.tracking),
    }
}

pub fn date_bounds(tracking: &Table<TrackingRecord>) -> Option<DateRange> {
    let mut dates = tracking.iter().filter_map(|t| t.date);
    let first = dates.next()?;
    let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    Some(DateRange { start: min, end: max })
}

pub fn has_date_column(tracking: &Table<TrackingRecord>) -> bool {
    tracking.has_column("date") || tracking.has_column("campaign_date")
}

// ─── Filtering ──────────────────────────────────────────────────────────────

pub fn filter_influencers<'a>(
    influencers: &'a Table<Influencer>,
    selection: &FilterSelection,
) -> Vec<&'a Influencer> {
    let by_platform = influencers.has_column("platform");
    let by_category = influencers.has_column("category");

    influencers
        .iter()
        .filter(|i| !by_platform || selection.platforms.matches(i.platform.as_deref()))
        .filter(|i| !by_category || selection.categories.matches(i.category.as_deref()))
        .collect()
}

/// The rows of the base tables that pass the current selection. Borrowed from
/// the data context; a fresh view is built per render.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    pub influencers: Vec<&'a Influencer>,
    pub tracking: Vec<&'a TrackingRecord>,
    /// The requested range after clamping to observed dates.
    pub date_range: Option<DateRange>,
    pub warnings: Vec<String>,
}

/// Apply `selection` to the data context.
///
/// Tracking rows are scoped to the filtered influencers only when the
/// influencer predicates narrow something; otherwise every tracking row is
/// kept, including rows for unknown influencers.
pub fn apply<'a>(data: &'a DataContext, selection: &FilterSelection) -> FilteredView<'a> {
    let influencers = filter_influencers(&data.influencers, selection);
    let mut warnings = Vec::new();

    for (column, sel) in [
        ("platform", &selection.platforms),
        ("category", &selection.categories),
    ] {
        if !sel.is_all() && !data.influencers.has_column(column) {
            let msg = format!("No '{column}' column found in influencers data");
            warn!("{msg}");
            warnings.push(msg);
        }
    }

    let scope: Option<HashSet<&str>> = selection.narrows(&data.influencers).then(|| {
        influencers
            .iter()
            .filter_map(|i| i.influencer_id.as_deref())
            .collect()
    });

    let date_range = match selection.date_range {
        Some(_) if !has_date_column(&data.tracking) => {
            let msg = "No date column found in tracking data; date range ignored".to_string();
            warn!("{msg}");
            warnings.push(msg);
            None
        }
        // A range disjoint from the observed dates is kept as requested and
        // matches nothing.
        Some(requested) => Some(
            date_bounds(&data.tracking)
                .and_then(|bounds| requested.clamp_to(&bounds))
                .unwrap_or(requested),
        ),
        None => None,
    };

    let tracking: Vec<&TrackingRecord> = data
        .tracking
        .iter()
        .filter(|t| match &scope {
            Some(ids) => t.influencer_id.as_deref().is_some_and(|id| ids.contains(id)),
            None => true,
        })
        .filter(|t| date_range.map_or(true, |range| range.contains(t.date)))
        .collect();

    debug!(
        influencers = influencers.len(),
        tracking = tracking.len(),
        "Filters applied"
    );

    FilteredView {
        influencers,
        tracking,
        date_range,
        warnings,
    }
}
