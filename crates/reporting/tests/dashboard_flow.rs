//! End-to-end: CSV files on disk -> cached load -> render -> export.

use influencer_core::config::ViewConfig;
use influencer_core::DashboardError;
use influencer_reporting::export::{self, CAMPAIGN_EXPORT_FILE, PAYOUTS_EXPORT_FILE, ROAS_EXPORT_FILE};
use influencer_reporting::filter::{DateRange, FilterSelection, Selection};
use influencer_reporting::{load_dataset, render, DataCache};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

const INFLUENCERS: &str = "\
influencer_id,name,username,platform,category,follower_count,engagement_rate
inf1,Asha Rao,asha.fit,Instagram,Fitness,120000,0.045
inf2,Ravi Kumar,ravi.eats,YouTube,Nutrition,450000,0.031
inf3,Meera Shah,,Instagram,Nutrition,80000,
";

const POSTS: &str = "\
post_id,influencer_id,platform,date,likes
p1,inf1,Instagram,2024-01-03,3400
";

const TRACKING: &str = "\
influencer_id,date,revenue,orders
inf1,2024-01-05,500,5
inf1,2024-01-06,300,0
inf2,2024-01-10,900,3
inf3,2024-02-01,100,1
ghost,not-a-date,50,1
";

const PAYOUTS: &str = "\
influencer_id,total_payout,status
inf1,1000,pending
inf2,2000,paid
inf3,500,Paid
";

fn write_dataset(dir: &Path) {
    fs::write(dir.join("influencers.csv"), INFLUENCERS).unwrap();
    fs::write(dir.join("posts.csv"), POSTS).unwrap();
    fs::write(dir.join("tracking_data.csv"), TRACKING).unwrap();
    fs::write(dir.join("payouts.csv"), PAYOUTS).unwrap();
}

fn dataset() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path());
    dir
}

#[test]
fn test_full_render_from_disk() {
    let dir = dataset();
    let data = load_dataset(dir.path()).unwrap();
    assert_eq!(data.influencers.len(), 3);
    assert_eq!(data.tracking.len(), 5);

    let view = render(&data, &FilterSelection::all(), &ViewConfig::default());
    assert_eq!(view.metrics.total_influencers, 3);
    assert_eq!(view.metrics.total_reach, Some(650_000));
    assert_eq!(view.metrics.total_revenue, 1850.0);
    assert_eq!(view.metrics.total_orders, 10);
    assert_eq!(view.top_influencers[0].handle, "ravi.eats");
    assert_eq!(view.top_influencers[2].handle, "Meera Shah");

    let roas = view.roas.available().unwrap();
    let inf1 = roas.rows.iter().find(|r| r.influencer_id == "inf1").unwrap();
    assert_eq!(inf1.roas, Some(0.5));
    assert_eq!(inf1.revenue, 800.0);
    assert_eq!(inf1.orders, 5);
    assert_eq!(roas.rows[0].influencer_id, "inf2");
    assert_eq!(roas.rows[0].roas, Some(3.0));
    // ROAS lists known influencers only; the revenue summary keeps the orphan.
    assert!(roas.rows.iter().all(|r| r.influencer_id != "ghost"));
    let campaign = view.campaign.available().unwrap();
    let ghost = campaign.rows.iter().find(|r| r.influencer_id == "ghost").unwrap();
    assert_eq!(ghost.name, None);

    let payouts = view.payouts.available().unwrap();
    let status = payouts.status.as_ref().unwrap();
    assert_eq!(status.pending_amount, 1000.0);
    assert_eq!(status.paid_amount, 2000.0);
    assert_eq!(payouts.rows[0].total_payout, Some(2000.0));
}

#[test]
fn test_filters_applied_end_to_end() {
    let dir = dataset();
    let data = load_dataset(dir.path()).unwrap();

    let selection = FilterSelection {
        platforms: Selection::only(["Instagram"]),
        date_range: Some(DateRange::new(
            chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )),
        ..Default::default()
    };
    let view = render(&data, &selection, &ViewConfig::default());
    assert_eq!(view.metrics.total_influencers, 2);
    // inf1's January rows only; inf3 is outside the range, ghost has no date.
    assert_eq!(view.metrics.total_revenue, 800.0);
    let campaign = view.campaign.available().unwrap();
    assert_eq!(campaign.rows.len(), 1);
    assert_eq!(campaign.rows[0].influencer_id, "inf1");
}

#[test]
fn test_missing_file_fails_whole_load() {
    let dir = dataset();
    fs::remove_file(dir.path().join("payouts.csv")).unwrap();
    match load_dataset(dir.path()) {
        Err(DashboardError::FileNotFound { file }) => assert_eq!(file, "payouts.csv"),
        other => panic!("expected FileNotFound, got {other:?}"),
    }
}

#[test]
fn test_malformed_file_is_parse_error() {
    let dir = dataset();
    fs::write(
        dir.path().join("tracking_data.csv"),
        "influencer_id,revenue,orders\ninf1,lots,2\n",
    )
    .unwrap();
    let err = load_dataset(dir.path()).unwrap_err();
    assert!(err.is_fatal());
    match err {
        DashboardError::Parse { file, message } => {
            assert_eq!(file, "tracking_data.csv");
            assert!(message.contains("revenue"));
        }
        other => panic!("expected Parse, got {other:?}"),
    }
}

#[test]
fn test_missing_tracking_column_degrades_only_that_section() {
    let dir = dataset();
    fs::write(
        dir.path().join("tracking_data.csv"),
        "influencer_id,revenue\ninf1,500\n",
    )
    .unwrap();
    let data = load_dataset(dir.path()).unwrap();
    let view = render(&data, &FilterSelection::all(), &ViewConfig::default());
    assert!(!view.roas.is_available());
    assert!(!view.campaign.is_available());
    assert!(view.payouts.is_available());
    assert_eq!(view.metrics.total_revenue, 500.0);
    assert_eq!(view.warnings.len(), 2);
}

#[test]
fn test_cache_reuses_and_invalidates() {
    let dir = dataset();
    let cache = DataCache::new(dir.path());
    assert!(!cache.is_loaded());
    assert!(!cache.is_stale());

    let first = cache.get_or_load().unwrap();
    let second = cache.get_or_load().unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));

    // Rewrite tracking with a later mtime: the cache keeps serving the old data
    // until invalidated.
    let tracking = dir.path().join("tracking_data.csv");
    fs::write(&tracking, "influencer_id,revenue,orders\ninf1,10,1\n").unwrap();
    fs::File::options()
        .write(true)
        .open(&tracking)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(120))
        .unwrap();
    assert!(cache.is_stale());
    assert_eq!(cache.get_or_load().unwrap().tracking.len(), 5);

    assert!(cache.invalidate());
    let reloaded = cache.get_or_load().unwrap();
    assert_eq!(reloaded.tracking.len(), 1);
    assert!(!cache.is_stale());
}

#[test]
fn test_failed_load_is_not_cached() {
    let dir = TempDir::new().unwrap();
    let cache = DataCache::new(dir.path());
    assert!(cache.get_or_load().is_err());
    assert!(!cache.is_loaded());

    write_dataset(dir.path());
    assert!(cache.get_or_load().is_ok());
}

#[test]
fn test_export_all_writes_untruncated_tables() {
    let dir = dataset();
    let out = TempDir::new().unwrap();
    let data = load_dataset(dir.path()).unwrap();
    let view = render(&data, &FilterSelection::all(), &ViewConfig { top_n: 1 });

    let report = export::export_all(&view, out.path()).unwrap();
    assert_eq!(report.written.len(), 3);
    assert!(report.skipped.is_empty());

    let roas = fs::read_to_string(out.path().join(ROAS_EXPORT_FILE)).unwrap();
    assert!(roas.starts_with("influencer_id,ROAS,revenue,orders,username\n"));
    // header + the three known influencers, despite top_n = 1
    assert_eq!(roas.lines().count(), 4);

    let campaign = fs::read_to_string(out.path().join(CAMPAIGN_EXPORT_FILE)).unwrap();
    assert!(campaign.starts_with("influencer_id,orders,revenue,username\ninf2,3,900,ravi.eats\n"));

    let payouts = fs::read_to_string(out.path().join(PAYOUTS_EXPORT_FILE)).unwrap();
    assert_eq!(
        payouts,
        "influencer_id,total_payout,status\ninf2,2000,paid\ninf1,1000,pending\ninf3,500,Paid\n"
    );
}

#[test]
fn test_export_skips_unavailable_sections() {
    let dir = dataset();
    fs::write(dir.path().join("tracking_data.csv"), "influencer_id,revenue,orders\n").unwrap();
    let out = TempDir::new().unwrap();
    let data = load_dataset(dir.path()).unwrap();
    let view = render(&data, &FilterSelection::all(), &ViewConfig::default());

    let report = export::export_all(&view, out.path()).unwrap();
    assert_eq!(report.written.len(), 1);
    assert_eq!(report.skipped.len(), 2);
    assert!(!out.path().join(ROAS_EXPORT_FILE).exists());
}
