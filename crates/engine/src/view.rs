//! One report view: filter state, catalogs, the last fetched report and
//! the methods the surrounding UI calls.
//!
//! Every method that reaches the service takes `&mut self`, so fetches on
//! one view are strictly sequential.

use std::collections::BTreeSet;

use api_types::{
    catalog::CatalogEntry, export::FilterDescription, report::ReportPayload, rpc::RpcCall,
};
use chrono::{Local, NaiveDate};
use tracing::{info, warn};

use crate::{
    AsOfPreset, Catalog, CatalogKind, CatalogSource, Catalogs, DatePreset, DateRangeError,
    EngineError, ExportKind, ExportRequest, FilterField, FilterState, GrandTotal, ReportData,
    ReportKind, ReportService, ReportSpec, ResultEngine, ServiceError, analytic_account_names,
    build_export_request,
    catalog::{entries_from_value, search_query},
};

const ANALYTIC_LINE_MODEL: &str = "account.analytic.line";

/// Source of the reference date presets resolve against.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The local calendar date of the host.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message for the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// What a remote-facing call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A new report replaced the displayed one.
    Updated { groups: usize },
    /// An export was handed to its service.
    Submitted,
    /// Nothing was sent; the filter state is invalid.
    Rejected,
    /// The remote call failed; the displayed report is unchanged.
    Failed,
}

pub struct ReportView<S> {
    spec: &'static ReportSpec,
    service: S,
    clock: Box<dyn Clock>,
    title: String,
    report_action: Option<String>,
    filters: FilterState,
    catalogs: Catalogs,
    report: Option<ReportData>,
    expanded: BTreeSet<String>,
    notices: Vec<Notice>,
}

impl<S: ReportService> ReportView<S> {
    /// Return a builder for `ReportView`.
    pub fn builder(kind: ReportKind, service: S) -> ReportViewBuilder<S> {
        ReportViewBuilder {
            kind,
            service,
            clock: None,
            title: None,
            report_action: None,
        }
    }

    pub fn kind(&self) -> ReportKind {
        self.spec.kind
    }

    pub fn spec(&self) -> &'static ReportSpec {
        self.spec
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn catalog(&self, kind: CatalogKind) -> Option<&Catalog> {
        self.catalogs.get(&kind)
    }

    /// The last successfully fetched report.
    pub fn report(&self) -> Option<&ReportData> {
        self.report.as_ref()
    }

    pub fn grand_total(&self) -> Option<&GrandTotal> {
        self.report.as_ref().map(|report| &report.grand_total)
    }

    pub fn date_error(&self) -> Option<DateRangeError> {
        self.filters.date_error()
    }

    pub fn export_enabled(&self) -> bool {
        self.report.is_some() && self.filters.date_error().is_none()
    }

    pub fn is_expanded(&self, group: &str) -> bool {
        self.expanded.contains(group)
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, level: NoticeLevel, message: String) {
        self.notices.push(Notice { level, message });
    }

    fn remote_failure(&mut self, what: &str, error: &ServiceError) {
        warn!(kind = %self.spec.kind, %error, "{what} failed");
        self.notify(NoticeLevel::Error, format!("{what} failed: {error}"));
    }

    fn init_call(&self) -> RpcCall {
        RpcCall::new(
            self.spec.model,
            self.spec.init_method,
            self.filters.initial_args(self.spec, &self.title),
        )
    }

    /// Replace a catalog, keeping the current search text.
    fn store_catalog(&mut self, kind: CatalogKind, entries: Vec<CatalogEntry>) {
        let mut catalog = Catalog::from_entries(entries);
        if let Some(previous) = self.catalogs.get(&kind)
            && !previous.query().is_empty()
        {
            let query = previous.query().to_string();
            catalog.search(&query);
        }
        self.catalogs.insert(kind, catalog);
    }

    /// Fetch one catalog. On failure the catalog falls back to just "All"
    /// and a notice is raised.
    pub async fn load_catalog(&mut self, kind: CatalogKind) -> ResultEngine<&[CatalogEntry]> {
        let source = self
            .spec
            .catalog_source(kind)
            .ok_or_else(|| EngineError::CatalogNotOffered(format!("{kind:?}")))?;
        let fetched = match source {
            CatalogSource::SearchRead { model, rank_field } => {
                self.service
                    .search_catalog(&search_query(model, rank_field))
                    .await
            }
            CatalogSource::InitPayload { key } => self
                .service
                .call_report(&self.init_call())
                .await
                .map(|payload| payload.get(key).map(entries_from_value).unwrap_or_default()),
        };
        let entries = match fetched {
            Ok(entries) => entries,
            Err(error) => {
                self.remote_failure("catalog lookup", &error);
                Vec::new()
            }
        };
        self.store_catalog(kind, entries);
        Ok(self
            .catalogs
            .get(&kind)
            .map(Catalog::entries)
            .unwrap_or_default())
    }

    /// Fetch every catalog the report offers.
    pub async fn load_catalogs(&mut self) -> ResultEngine<()> {
        for (kind, _) in self.spec.catalogs {
            self.load_catalog(*kind).await?;
        }
        Ok(())
    }

    /// Search a catalog by name or code.
    pub fn filter_catalog(
        &mut self,
        kind: CatalogKind,
        query: &str,
    ) -> ResultEngine<&[CatalogEntry]> {
        if self.spec.catalog_source(kind).is_none() {
            return Err(EngineError::CatalogNotOffered(format!("{kind:?}")));
        }
        Ok(self.catalogs.entry(kind).or_default().search(query))
    }

    pub fn set_date_range_preset(&mut self, preset: DatePreset) {
        self.filters.set_preset(preset);
    }

    pub fn set_as_of_preset(&mut self, preset: AsOfPreset) {
        self.filters.set_as_of(preset);
    }

    /// Apply one typed filter edit. An invalid date range is reported as a
    /// notice and blocks refresh and export until corrected.
    pub fn update_filter_field(&mut self, field: FilterField) -> ResultEngine<()> {
        self.filters.apply(self.spec, field)?;
        if let Some(error) = self.filters.date_error() {
            self.notify(NoticeLevel::Warning, format!("Invalid date range: {error}"));
        }
        Ok(())
    }

    /// Fetch the offered search catalogs and the unfiltered report.
    ///
    /// Catalogs carried by the report payload are filled from it.
    pub async fn load_initial(&mut self) -> ResultEngine<Outcome> {
        for (kind, source) in self.spec.catalogs {
            if matches!(source, CatalogSource::SearchRead { .. }) {
                self.load_catalog(*kind).await?;
            }
        }
        let call = self.init_call();
        Ok(self.fetch(call).await)
    }

    /// Fetch the report for the current filters.
    pub async fn apply_filter(&mut self) -> ResultEngine<Outcome> {
        if let Some(error) = self.filters.date_error() {
            self.notify(
                NoticeLevel::Warning,
                format!("Report not refreshed: {error}"),
            );
            return Ok(Outcome::Rejected);
        }
        let dates = self.filters.dates().resolve(self.clock.today())?;
        let args = self.filters.filter_args(self.spec, &self.catalogs, dates);
        let call = RpcCall::new(self.spec.model, self.spec.filter_method, args);
        Ok(self.fetch(call).await)
    }

    async fn fetch(&mut self, call: RpcCall) -> Outcome {
        let payload = match self.service.call_report(&call).await {
            Ok(payload) => payload,
            Err(error) => {
                self.remote_failure("report fetch", &error);
                return Outcome::Failed;
            }
        };
        let mut report = ReportData::from_payload(self.spec, &payload);
        if self.spec.analytic_labels {
            self.label_analytic_lines(&mut report).await;
        }
        let groups = self.install(&payload, report);
        Outcome::Updated { groups }
    }

    /// Look up the analytic accounts of the report rows. On failure the rows
    /// stay unlabelled.
    async fn label_analytic_lines(&mut self, report: &mut ReportData) {
        let ids: Vec<i64> = report.analytic_line_ids().into_iter().collect();
        if ids.is_empty() {
            return;
        }
        match self
            .service
            .read_records(ANALYTIC_LINE_MODEL, &ids, &["account_id"])
            .await
        {
            Ok(records) => report.label_analytic_lines(&analytic_account_names(&records)),
            Err(error) => self.remote_failure("analytic lookup", &error),
        }
    }

    /// Replace report, totals and payload catalogs in one step.
    fn install(&mut self, payload: &ReportPayload, report: ReportData) -> usize {
        for (kind, source) in self.spec.catalogs {
            if let CatalogSource::InitPayload { key } = source
                && let Some(value) = payload.get(*key)
            {
                self.store_catalog(*kind, entries_from_value(value));
            }
        }
        let groups = report.groups.len();
        info!(kind = %self.spec.kind, groups, "report updated");
        self.report = Some(report);
        self.expanded.clear();
        groups
    }

    /// Filter summary shown on exports.
    pub fn filter_description(&self) -> ResultEngine<FilterDescription> {
        let dates = self.filters.dates().resolve(self.clock.today())?;
        Ok(self.filters.describe(self.spec, &self.catalogs, dates))
    }

    fn export_request(&mut self, kind: ExportKind) -> ResultEngine<ExportRequest> {
        let request = self.filter_description().and_then(|filters| {
            build_export_request(
                kind,
                self.spec,
                &self.title,
                self.report.as_ref(),
                filters,
                self.filters.date_error(),
                self.report_action.as_deref(),
            )
        });
        if let Err(EngineError::ExportRefused(reason)) = &request {
            let message = format!("Export refused: {reason}");
            self.notify(NoticeLevel::Warning, message);
        }
        request
    }

    async fn submit(&mut self, request: ExportRequest) -> Outcome {
        let (what, sent) = match &request {
            ExportRequest::Document {
                report_name,
                bundle,
            } => (
                "document export",
                self.service.render_document(report_name, bundle).await,
            ),
            ExportRequest::Spreadsheet(form) => (
                "spreadsheet export",
                self.service.download_spreadsheet(form).await,
            ),
        };
        match sent {
            Ok(()) => {
                info!(kind = %self.spec.kind, "{what} submitted");
                self.notify(NoticeLevel::Info, format!("{what} submitted"));
                Outcome::Submitted
            }
            Err(error) => {
                self.remote_failure(what, &error);
                Outcome::Failed
            }
        }
    }

    /// Render the displayed report as a document.
    pub async fn export_document(&mut self) -> ResultEngine<Outcome> {
        let request = self.export_request(ExportKind::Document)?;
        Ok(self.submit(request).await)
    }

    /// Download the displayed report as a spreadsheet.
    pub async fn export_spreadsheet(&mut self) -> ResultEngine<Outcome> {
        let request = self.export_request(ExportKind::Spreadsheet)?;
        Ok(self.submit(request).await)
    }

    /// Toggle one group, or with `None` unfold everything (fold everything
    /// if all groups are already open).
    pub fn toggle_group_expansion(&mut self, group: Option<&str>) {
        match group {
            Some(group) => {
                if !self.expanded.remove(group) {
                    self.expanded.insert(group.to_string());
                }
            }
            None => {
                let groups = self
                    .report
                    .as_ref()
                    .map(|report| report.groups.as_slice())
                    .unwrap_or_default();
                if !groups.is_empty() && groups.iter().all(|g| self.expanded.contains(g)) {
                    self.expanded.clear();
                } else {
                    self.expanded = groups.iter().cloned().collect();
                }
            }
        }
    }
}

pub struct ReportViewBuilder<S> {
    kind: ReportKind,
    service: S,
    clock: Option<Box<dyn Clock>>,
    title: Option<String>,
    report_action: Option<String>,
}

impl<S: ReportService> ReportViewBuilder<S> {
    /// Reference date source. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Action title. Defaults to the report kind's title.
    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn report_action(mut self, action: &str) -> Self {
        self.report_action = Some(action.to_string());
        self
    }

    /// Construct `ReportView`
    pub fn build(self) -> ReportView<S> {
        let spec = self.kind.spec();
        let catalogs = spec
            .catalogs
            .iter()
            .map(|(kind, _)| (*kind, Catalog::default()))
            .collect();
        ReportView {
            spec,
            service: self.service,
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock)),
            title: self.title.unwrap_or_else(|| spec.title.to_string()),
            report_action: self.report_action,
            filters: FilterState::new(spec),
            catalogs,
            report: None,
            expanded: BTreeSet::new(),
            notices: Vec::new(),
        }
    }
}
