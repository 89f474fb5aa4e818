//! Plain-text rendering of the dashboard view model.

use influencer_reporting::dashboard::DashboardView;
use influencer_reporting::export::ExportReport;
use influencer_reporting::filter::FilterOptions;
use influencer_reporting::Section;

/// `1234567` -> `1,234,567`
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn format_amount(value: f64) -> String {
    format!("₹{}", group_thousands(value.max(0.0).round() as u64))
}

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 {
        return String::new();
    }
    "#".repeat(((value / max) * 30.0).round() as usize)
}

pub fn print_dashboard(view: &DashboardView) {
    println!("=== Influencer Campaign Dashboard ===");
    if let Some(range) = view.applied_date_range {
        println!("  Dates: {} .. {}", range.start, range.end);
    }
    println!();

    let m = &view.metrics;
    println!("  Total Influencers:  {}", m.total_influencers);
    match m.total_reach {
        Some(reach) => println!("  Total Reach:        {}", group_thousands(reach)),
        None => println!("  Total Reach:        N/A"),
    }
    println!("  Total Revenue:      {}", format_amount(m.total_revenue));
    println!("  Total Orders:       {}", group_thousands(m.total_orders));
    println!();

    println!("  Top Influencers");
    for card in &view.top_influencers {
        let engagement = card
            .engagement_rate
            .map(|r| format!("{:.2}%", r * 100.0))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "    @{:<20} {:<12} {:<14} {:>12} followers  {}",
            card.handle,
            card.platform,
            card.category,
            group_thousands(card.followers),
            engagement
        );
    }
    println!();

    println!("  Top Performing Campaigns (by ROAS)");
    match &view.roas {
        Section::Available(_) => {
            let rows = view.roas_leaderboard();
            let max = rows.first().and_then(|r| r.roas).unwrap_or(0.0);
            for row in rows {
                let label = row.name.as_deref().unwrap_or(&row.influencer_id);
                let roas = row
                    .roas
                    .map(|r| format!("{r:.2}"))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "    {:<20} {:>8} {:>12} {:>6}  {}",
                    label,
                    roas,
                    format_amount(row.revenue),
                    row.orders,
                    bar(row.roas.unwrap_or(0.0), max)
                );
            }
        }
        Section::Unavailable { reason } => println!("    {reason}"),
    }
    println!();

    println!("  Revenue and Orders");
    match &view.campaign {
        Section::Available(_) => {
            let rows = view.campaign_leaderboard();
            let max = rows.first().map_or(0.0, |r| r.revenue);
            for row in rows {
                let label = row.name.as_deref().unwrap_or(&row.influencer_id);
                println!(
                    "    {:<20} {:>12} {:>6}  {}",
                    label,
                    format_amount(row.revenue),
                    row.orders,
                    bar(row.revenue, max)
                );
            }
        }
        Section::Unavailable { reason } => println!("    {reason}"),
    }
    println!();

    println!("  Payout Tracking");
    match &view.payouts {
        Section::Available(summary) => {
            if let Some(status) = &summary.status {
                println!("    Pending Payouts:  {}", format_amount(status.pending_amount));
                println!("    Paid Amount:      {}", format_amount(status.paid_amount));
                for entry in &status.distribution {
                    println!("      {:<12} {}", entry.status, entry.count);
                }
            }
            for payout in &summary.rows {
                println!(
                    "    {:<20} {:>12}  {}",
                    payout.influencer_id.as_deref().unwrap_or("-"),
                    payout
                        .total_payout
                        .map(format_amount)
                        .unwrap_or_else(|| "-".to_string()),
                    payout
                        .status
                        .as_ref()
                        .map(|s| s.as_str())
                        .unwrap_or("-")
                );
            }
        }
        Section::Unavailable { reason } => println!("    {reason}"),
    }

    if !view.warnings.is_empty() {
        println!();
        println!("  Warnings");
        for warning in &view.warnings {
            println!("    ! {warning}");
        }
    }
    println!();
    println!(
        "  Dashboard last updated: {}",
        view.generated_at.format("%Y-%m-%d %H:%M:%S")
    );
}

pub fn print_options(options: &FilterOptions) {
    let list = |values: &Option<Vec<String>>| match values {
        Some(v) => v.join(", "),
        None => "(column not present)".to_string(),
    };
    println!("Platforms:   {}", list(&options.platforms));
    println!("Categories:  {}", list(&options.categories));
    match options.date_bounds {
        Some(range) => println!("Dates:       {} .. {}", range.start, range.end),
        None => println!("Dates:       (no dates in tracking data)"),
    }
}

pub fn print_export(report: &ExportReport) {
    for path in &report.written {
        println!("Exported: {}", path.display());
    }
    for (file, reason) in &report.skipped {
        println!("Skipped {file}: {reason}");
    }
}
