//! CSV export of the dashboard's summary tables.

use crate::dashboard::DashboardView;
use crate::payouts::PayoutSummary;
use crate::pipeline::{CampaignSummary, RoasSummary, Section};
use influencer_core::DashboardResult;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const ROAS_EXPORT_FILE: &str = "roas_summary.csv";
pub const PAYOUTS_EXPORT_FILE: &str = "payouts.csv";
pub const CAMPAIGN_EXPORT_FILE: &str = "campaign_summary.csv";

/// Outcome of [`export_all`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    /// `(file name, reason)` for sections that had nothing to export.
    pub skipped: Vec<(String, String)>,
}

/// Full ROAS summary: `influencer_id,ROAS,revenue,orders[,<name column>]`.
pub fn write_roas_summary<W: Write>(summary: &RoasSummary, out: W) -> DashboardResult<()> {
    let mut writer = csv::Writer::from_writer(out);
    let mut header = vec!["influencer_id", "ROAS", "revenue", "orders"];
    if let Some(col) = summary.name_column.as_deref() {
        header.push(col);
    }
    writer.write_record(&header)?;

    for row in &summary.rows {
        let mut record = vec![
            row.influencer_id.clone(),
            row.roas.map(|v| v.to_string()).unwrap_or_default(),
            row.revenue.to_string(),
            row.orders.to_string(),
        ];
        if summary.name_column.is_some() {
            record.push(row.name.clone().unwrap_or_default());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Full campaign summary: `influencer_id,orders,revenue[,<name column>]`.
pub fn write_campaign_summary<W: Write>(
    summary: &CampaignSummary,
    out: W,
) -> DashboardResult<()> {
    let mut writer = csv::Writer::from_writer(out);
    let mut header = vec!["influencer_id", "orders", "revenue"];
    if let Some(col) = summary.name_column.as_deref() {
        header.push(col);
    }
    writer.write_record(&header)?;

    for row in &summary.rows {
        let mut record = vec![
            row.influencer_id.clone(),
            row.orders.to_string(),
            row.revenue.to_string(),
        ];
        if summary.name_column.is_some() {
            record.push(row.name.clone().unwrap_or_default());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Every column of the payouts file, in source order, rows ranked by amount.
pub fn write_payouts<W: Write>(summary: &PayoutSummary, out: W) -> DashboardResult<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(&summary.columns)?;
    for payout in &summary.rows {
        writer.write_record(
            summary
                .columns
                .iter()
                .map(|c| payout.cell(c).unwrap_or_default()),
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Render a summary into an in-memory CSV document, as served for download.
pub fn to_csv_string<T>(
    summary: &T,
    write: impl Fn(&T, &mut Vec<u8>) -> DashboardResult<()>,
) -> DashboardResult<String> {
    let mut buf = Vec::new();
    write(summary, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn export_section<T>(
    section: &Section<T>,
    dir: &Path,
    file_name: &str,
    write: impl Fn(&T, std::fs::File) -> DashboardResult<()>,
    report: &mut ExportReport,
) -> DashboardResult<()> {
    match section {
        Section::Available(summary) => {
            let path = dir.join(file_name);
            write(summary, std::fs::File::create(&path)?)?;
            info!(path = %path.display(), "Exported");
            report.written.push(path);
        }
        Section::Unavailable { reason } => {
            warn!(file = file_name, reason = %reason, "Export skipped");
            report
                .skipped
                .push((file_name.to_string(), reason.clone()));
        }
    }
    Ok(())
}

/// Write every available summary of `view` into `dir`, creating it if needed.
/// Exports are never truncated to the leaderboard size.
pub fn export_all(view: &DashboardView, dir: &Path) -> DashboardResult<ExportReport> {
    std::fs::create_dir_all(dir)?;
    let mut report = ExportReport::default();

    export_section(
        &view.roas,
        dir,
        ROAS_EXPORT_FILE,
        |s, f| write_roas_summary(s, f),
        &mut report,
    )?;
    export_section(
        &view.payouts,
        dir,
        PAYOUTS_EXPORT_FILE,
        |s, f| write_payouts(s, f),
        &mut report,
    )?;
    export_section(
        &view.campaign,
        dir,
        CAMPAIGN_EXPORT_FILE,
        |s, f| write_campaign_summary(s, f),
        &mut report,
    )?;

    Ok(report)
}
