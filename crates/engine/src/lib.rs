//! Filter-to-report pipeline shared by the accounting report views.
//!
//! A [`ReportView`] owns the filter state of one report kind, loads the
//! selectable catalogs, fetches the report through a [`ReportService`],
//! folds the per-group totals into a [`GrandTotal`] and builds export
//! requests from the last displayed report.

pub use aggregate::{GrandTotal, ReportData, analytic_account_names, flatten_rows};
pub use catalog::{ALL_LABEL, Catalog, Catalogs, all_entry, filter_catalog, search_query};
pub use dates::{
    AsOfPreset, DatePreset, DateRange, DateSelection, RawRange, ResolvedDates, normalize_date,
    resolve_as_of, resolve_preset, to_canonical, to_display, validate_range,
};
pub use error::{DateRangeError, EngineError, ServiceError};
pub use export::{ExportKind, ExportRequest, SPREADSHEET_FORMAT, build_export_request};
pub use filters::{FilterField, FilterState};
pub use kind::{
    AmountField, CatalogKind, CatalogSource, DateMode, OpeningBalance, OptionGroup, ReportKind,
    ReportOption, ReportSpec,
};
pub use service::ReportService;
pub use view::{
    Clock, FixedClock, Notice, NoticeLevel, Outcome, ReportView, ReportViewBuilder, SystemClock,
};

mod aggregate;
mod catalog;
mod dates;
mod error;
mod export;
mod filters;
mod kind;
mod service;
mod view;

pub type ResultEngine<T> = Result<T, EngineError>;
