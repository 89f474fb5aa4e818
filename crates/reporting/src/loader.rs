//! Dataset loader: reads the four campaign CSV files into typed tables and
//! keeps them cached for the lifetime of the process.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use influencer_core::{
    DashboardError, DashboardResult, Influencer, Payout, PayoutStatus, Post, Table,
    TrackingRecord,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};

pub const INFLUENCERS_FILE: &str = "influencers.csv";
pub const POSTS_FILE: &str = "posts.csv";
pub const TRACKING_FILE: &str = "tracking_data.csv";
pub const PAYOUTS_FILE: &str = "payouts.csv";

const DATASET_FILES: [&str; 4] = [INFLUENCERS_FILE, POSTS_FILE, TRACKING_FILE, PAYOUTS_FILE];

/// Cell values read as null, in addition to the empty string.
const NULL_TOKENS: [&str; 7] = ["NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// The immutable base tables every render reads from.
#[derive(Debug, Clone, Default)]
pub struct DataContext {
    pub influencers: Table<Influencer>,
    pub posts: Table<Post>,
    pub tracking: Table<TrackingRecord>,
    pub payouts: Table<Payout>,
}

/// Load all four datasets from `dir`. Either every file loads or the whole
/// load fails with the first error encountered.
pub fn load_dataset(dir: &Path) -> DashboardResult<DataContext> {
    let influencers: Table<Influencer> = read_table(dir, INFLUENCERS_FILE)?;
    let posts: Table<Post> = read_table(dir, POSTS_FILE)?;
    let tracking: Table<TrackingRecord> = read_table(dir, TRACKING_FILE)?;
    let payouts: Table<Payout> = read_table(dir, PAYOUTS_FILE)?;

    info!(
        dir = %dir.display(),
        influencers = influencers.len(),
        posts = posts.len(),
        tracking = tracking.len(),
        payouts = payouts.len(),
        "Dataset loaded"
    );

    Ok(DataContext {
        influencers,
        posts,
        tracking,
        payouts,
    })
}

fn read_table<T: FromCsvRow>(dir: &Path, file_name: &str) -> DashboardResult<Table<T>> {
    let path = dir.join(file_name);
    let file = File::open(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DashboardError::FileNotFound {
            file: file_name.to_string(),
        },
        _ => DashboardError::parse(file_name, e.to_string()),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| DashboardError::parse(file_name, e.to_string()))?
        .clone();
    if headers.iter().all(str::is_empty) {
        return Err(DashboardError::parse(file_name, "no columns to parse"));
    }

    let columns: Vec<String> = headers.iter().map(String::from).collect();
    let index: HashMap<&str, usize> = columns
        .iter()
        .enumerate()
        .rev()
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| DashboardError::parse(file_name, e.to_string()))?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let row = CsvRow {
            index: &index,
            columns: &columns,
            record: &record,
        };
        let value = T::from_row(&row)
            .map_err(|msg| DashboardError::parse(file_name, format!("line {line}: {msg}")))?;
        rows.push(value);
    }

    debug!(file = file_name, rows = rows.len(), "Table read");
    Ok(Table::new(columns.clone(), rows))
}

// ─── Row decoding ───────────────────────────────────────────────────────────

/// A single CSV record addressed by column name.
struct CsvRow<'a> {
    index: &'a HashMap<&'a str, usize>,
    columns: &'a [String],
    record: &'a csv::StringRecord,
}

impl<'a> CsvRow<'a> {
    fn has(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    /// Raw cell text, `None` when the column is absent or the cell is null.
    fn get(&self, column: &str) -> Option<&'a str> {
        let idx = *self.index.get(column)?;
        let value = self.record.get(idx)?;
        if value.is_empty() || NULL_TOKENS.contains(&value) {
            None
        } else {
            Some(value)
        }
    }

    fn text(&self, column: &str) -> Option<String> {
        self.get(column).map(String::from)
    }

    fn float(&self, column: &str) -> Result<Option<f64>, String> {
        let Some(raw) = self.get(column) else {
            return Ok(None);
        };
        let value: f64 = raw
            .parse()
            .map_err(|_| format!("column '{column}': '{raw}' is not a number"))?;
        if !value.is_finite() {
            return Err(format!("column '{column}': '{raw}' is not a finite number"));
        }
        Ok(Some(value))
    }

    fn non_negative_float(&self, column: &str) -> Result<Option<f64>, String> {
        match self.float(column)? {
            Some(v) if v < 0.0 => Err(format!("column '{column}': {v} is negative")),
            other => Ok(other),
        }
    }

    /// Non-negative integer; integral floats such as `"5.0"` are accepted.
    fn count(&self, column: &str) -> Result<Option<u64>, String> {
        let Some(raw) = self.get(column) else {
            return Ok(None);
        };
        if let Ok(v) = raw.parse::<u64>() {
            return Ok(Some(v));
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 => {
                Ok(Some(v as u64))
            }
            _ => Err(format!(
                "column '{column}': '{raw}' is not a non-negative integer"
            )),
        }
    }

    /// Non-null cells of every column not in `keyed`.
    fn remaining(&self, keyed: &[&str]) -> BTreeMap<String, String> {
        self.columns
            .iter()
            .filter(|c| !keyed.contains(&c.as_str()))
            .filter_map(|c| self.get(c).map(|v| (c.clone(), v.to_string())))
            .collect()
    }

    /// Unparsable dates become `None` rather than an error.
    fn date(&self, column: &str) -> Option<NaiveDate> {
        self.get(column).and_then(parse_date)
    }
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

trait FromCsvRow: Sized {
    fn from_row(row: &CsvRow<'_>) -> Result<Self, String>;
}

impl FromCsvRow for Influencer {
    fn from_row(row: &CsvRow<'_>) -> Result<Self, String> {
        let engagement_rate = row.float("engagement_rate")?;
        if let Some(rate) = engagement_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err(format!(
                    "column 'engagement_rate': {rate} is outside [0, 1]"
                ));
            }
        }
        Ok(Self {
            influencer_id: row.text("influencer_id"),
            name: row.text("name"),
            username: row.text("username"),
            platform: row.text("platform"),
            category: row.text("category"),
            follower_count: row.count("follower_count")?,
            engagement_rate,
        })
    }
}

impl FromCsvRow for Post {
    fn from_row(row: &CsvRow<'_>) -> Result<Self, String> {
        Ok(Self {
            post_id: row.text("post_id"),
            influencer_id: row.text("influencer_id"),
            platform: row.text("platform"),
            date: row.date("date"),
            metadata: row.remaining(&["post_id", "influencer_id", "platform", "date"]),
        })
    }
}

impl FromCsvRow for TrackingRecord {
    fn from_row(row: &CsvRow<'_>) -> Result<Self, String> {
        let date = if row.has("date") {
            row.date("date")
        } else {
            row.date("campaign_date")
        };
        Ok(Self {
            influencer_id: row.text("influencer_id"),
            revenue: row.non_negative_float("revenue")?,
            orders: row.count("orders")?,
            date,
        })
    }
}

impl FromCsvRow for Payout {
    fn from_row(row: &CsvRow<'_>) -> Result<Self, String> {
        Ok(Self {
            influencer_id: row.text("influencer_id"),
            total_payout: row.float("total_payout")?,
            status: row.get("status").map(PayoutStatus::from),
            extra: row.remaining(&["influencer_id", "total_payout", "status"]),
        })
    }
}

// ─── Cache ──────────────────────────────────────────────────────────────────

struct CachedDataset {
    data: Arc<DataContext>,
    modified: Vec<Option<SystemTime>>,
}

/// Process-lifetime cache of the loaded dataset. The first successful load is
/// kept until [`DataCache::invalidate`] is called; failed loads are not cached.
pub struct DataCache {
    dir: PathBuf,
    slot: RwLock<Option<CachedDataset>>,
}

impl DataCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            slot: RwLock::new(None),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Return the cached dataset, reading it from disk on first use.
    pub fn get_or_load(&self) -> DashboardResult<Arc<DataContext>> {
        if let Some(cached) = self.slot.read().as_ref() {
            debug!("Dataset cache hit");
            return Ok(cached.data.clone());
        }

        let mut slot = self.slot.write();
        if let Some(cached) = slot.as_ref() {
            return Ok(cached.data.clone());
        }

        let modified = modification_times(&self.dir);
        let data = Arc::new(load_dataset(&self.dir)?);
        *slot = Some(CachedDataset {
            data: data.clone(),
            modified,
        });
        Ok(data)
    }

    /// Drop the cached dataset. Returns `true` if something was cached.
    pub fn invalidate(&self) -> bool {
        let dropped = self.slot.write().take().is_some();
        if dropped {
            info!(dir = %self.dir.display(), "Dataset cache invalidated");
        }
        dropped
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Whether any source file changed on disk since the cached load.
    /// Always `false` when nothing is cached.
    pub fn is_stale(&self) -> bool {
        match self.slot.read().as_ref() {
            Some(cached) => cached.modified != modification_times(&self.dir),
            None => false,
        }
    }
}

fn modification_times(dir: &Path) -> Vec<Option<SystemTime>> {
    DATASET_FILES
        .iter()
        .map(|f| {
            std::fs::metadata(dir.join(f))
                .and_then(|m| m.modified())
                .ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode<T: FromCsvRow>(data: &str) -> Result<Table<T>, String> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data.as_bytes());
        let columns: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        let index: HashMap<&str, usize> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.unwrap();
            let row = CsvRow {
                index: &index,
                columns: &columns,
                record: &record,
            };
            rows.push(T::from_row(&row)?);
        }
        Ok(Table::new(columns.clone(), rows))
    }

    #[test]
    fn test_influencer_optional_columns() {
        let table: Table<Influencer> = decode(
            "influencer_id,name,platform,follower_count\n\
             inf1,Asha,Instagram,12000\n\
             inf2,,YouTube,\n",
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert!(!table.has_column("category"));
        assert_eq!(table.rows[0].follower_count, Some(12000));
        assert_eq!(table.rows[1].name, None);
        assert_eq!(table.rows[1].follower_count, None);
        assert_eq!(table.rows[1].category, None);
    }

    #[test]
    fn test_engagement_rate_out_of_range_rejected() {
        let err = decode::<Influencer>("influencer_id,engagement_rate\ninf1,1.5\n").unwrap_err();
        assert!(err.contains("engagement_rate"));
    }

    #[test]
    fn test_tracking_counts_accept_integral_floats() {
        let table: Table<TrackingRecord> =
            decode("influencer_id,revenue,orders\ninf1,500.5,5.0\ninf1,NaN,\n").unwrap();
        assert_eq!(table.rows[0].orders, Some(5));
        assert_eq!(table.rows[0].revenue, Some(500.5));
        assert_eq!(table.rows[1].revenue, None);
        assert_eq!(table.rows[1].orders, None);
    }

    #[test]
    fn test_tracking_rejects_fractional_or_negative_orders() {
        assert!(decode::<TrackingRecord>("influencer_id,orders\ninf1,2.5\n").is_err());
        assert!(decode::<TrackingRecord>("influencer_id,orders\ninf1,-1\n").is_err());
        assert!(decode::<TrackingRecord>("influencer_id,revenue\ninf1,-10\n").is_err());
        assert!(decode::<TrackingRecord>("influencer_id,revenue\ninf1,abc\n").is_err());
    }

    #[test]
    fn test_tracking_date_falls_back_to_campaign_date() {
        let table: Table<TrackingRecord> = decode(
            "influencer_id,campaign_date\ninf1,2024-03-05\ninf2,not-a-date\n",
        )
        .unwrap();
        assert_eq!(table.rows[0].date, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(table.rows[1].date, None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 7, 1);
        assert_eq!(parse_date("2024-07-01"), expected);
        assert_eq!(parse_date("2024/07/01"), expected);
        assert_eq!(parse_date("07/01/2024"), expected);
        assert_eq!(parse_date("2024-07-01 13:45:00"), expected);
        assert_eq!(parse_date("2024-07-01T13:45:00+05:30"), expected);
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_post_metadata_keeps_extra_columns() {
        let table: Table<Post> = decode(
            "post_id,influencer_id,platform,date,likes,caption\np1,inf1,Instagram,2024-01-03,340,\n",
        )
        .unwrap();
        let post = &table.rows[0];
        assert_eq!(post.post_id.as_deref(), Some("p1"));
        assert_eq!(post.date, NaiveDate::from_ymd_opt(2024, 1, 3));
        assert!(!post.metadata.contains_key("date"));
        assert_eq!(post.metadata.get("likes").map(String::as_str), Some("340"));
        assert!(!post.metadata.contains_key("caption"));
        assert!(!post.metadata.contains_key("influencer_id"));
    }

    #[test]
    fn test_payout_status_kept_verbatim() {
        let table: Table<Payout> = decode(
            "influencer_id,total_payout,status\ninf1,1000,pending\ninf2,500,Paid\ninf3,,\n",
        )
        .unwrap();
        assert_eq!(table.rows[0].status, Some(PayoutStatus::Pending));
        assert_eq!(table.rows[1].status, Some(PayoutStatus::Other("Paid".into())));
        assert_eq!(table.rows[2].total_payout, None);
        assert_eq!(table.rows[2].status, None);
    }

    #[test]
    fn test_payout_extra_columns_kept() {
        let table: Table<Payout> = decode(
            "influencer_id,basis,rate,orders,total_payout,status\ninf1,cpo,100,10,1000,paid\ninf2,,,,,\n",
        )
        .unwrap();
        assert_eq!(
            table.columns,
            vec!["influencer_id", "basis", "rate", "orders", "total_payout", "status"]
        );
        let first = &table.rows[0];
        assert_eq!(first.extra.get("basis").map(String::as_str), Some("cpo"));
        assert_eq!(first.extra.get("orders").map(String::as_str), Some("10"));
        assert!(!first.extra.contains_key("status"));
        assert!(table.rows[1].extra.is_empty());
    }
}
