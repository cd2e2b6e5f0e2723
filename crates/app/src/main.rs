use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use client::OdooClient;
use engine::{
    AsOfPreset, DateMode, DatePreset, EngineError, FilterField, NoticeLevel, Outcome, ReportKind,
    ReportOption, ReportService, ReportView,
};

use crate::error::AppError;

mod error;
mod settings;

/// "Today" in the configured time zone.
struct ZonedClock(Tz);

impl engine::Clock for ZonedClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.0).date_naive()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (settings, args) = settings::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "accounts_report={level},engine={level},client={level}",
            level = settings.level
        ))
        .init();

    let timezone: Tz = settings
        .timezone
        .parse()
        .map_err(|_| AppError::Timezone(settings.timezone.clone()))?;
    let kind: ReportKind = args.kind.parse().map_err(AppError::from)?;

    let client = OdooClient::builder()
        .base_url(&settings.base_url)
        .credentials(&settings.database, &settings.login, &settings.password)
        .output_dir(&settings.output_dir)
        .build()
        .map_err(AppError::from)?;
    client.authenticate().await.map_err(AppError::from)?;

    let mut view = ReportView::builder(kind, client)
        .clock(ZonedClock(timezone))
        .build();
    tracing::info!(%kind, "loading report");
    view.load_initial().await.map_err(AppError::from)?;

    if args.has_filters() {
        apply_args(&mut view, &args).map_err(AppError::from)?;
        if view.apply_filter().await.map_err(AppError::from)? == Outcome::Rejected {
            tracing::warn!("filters rejected, showing the unfiltered report");
        }
    }
    print_report(&view);

    if args.pdf {
        export(&mut view, true).await;
    }
    if args.xlsx {
        export(&mut view, false).await;
    }

    for notice in view.take_notices() {
        match notice.level {
            NoticeLevel::Info => tracing::info!("{}", notice.message),
            NoticeLevel::Warning => tracing::warn!("{}", notice.message),
            NoticeLevel::Error => tracing::error!("{}", notice.message),
        }
    }
    Ok(())
}

fn apply_args<S: ReportService>(
    view: &mut ReportView<S>,
    args: &settings::Args,
) -> Result<(), EngineError> {
    if let Some(preset) = &args.preset {
        match view.spec().date_mode {
            DateMode::AsOf => view.set_as_of_preset(preset.parse::<AsOfPreset>()?),
            DateMode::Range => view.set_date_range_preset(preset.parse::<DatePreset>()?),
        }
    }
    if let Some(from) = &args.from {
        view.update_filter_field(FilterField::StartDate(from.clone()))?;
    }
    if let Some(to) = &args.to {
        view.update_filter_field(FilterField::EndDate(to.clone()))?;
    }
    for id in &args.partner {
        view.update_filter_field(FilterField::Partner(Some(*id)))?;
    }
    for id in &args.account {
        view.update_filter_field(FilterField::Account(Some(*id)))?;
    }
    for id in &args.journal {
        view.update_filter_field(FilterField::Journal(Some(*id)))?;
    }
    if args.draft {
        view.update_filter_field(FilterField::Option(ReportOption::Draft))?;
    }
    for option in &args.options {
        view.update_filter_field(FilterField::Option(option.parse()?))?;
    }
    Ok(())
}

async fn export<S: ReportService>(view: &mut ReportView<S>, document: bool) {
    let sent = if document {
        view.export_document().await
    } else {
        view.export_spreadsheet().await
    };
    match sent {
        Ok(Outcome::Submitted) => {}
        Ok(outcome) => tracing::warn!(?outcome, "export not submitted"),
        Err(err) => tracing::error!("{err}"),
    }
}

fn print_report<S: ReportService>(view: &ReportView<S>) {
    println!("{}", view.title());
    let Some(report) = view.report() else {
        println!("  (no data)");
        return;
    };
    for group in &report.groups {
        let lines = report
            .rows
            .get(group)
            .and_then(|rows| rows.as_array())
            .map_or(0, Vec::len);
        println!("  {group:<40} {lines:>5} lines");
    }
    let currency = report.grand_total.currency().unwrap_or_default();
    for (name, amount) in report.grand_total.amounts() {
        println!("  {name:<40} {amount:>14} {currency}");
    }
}
