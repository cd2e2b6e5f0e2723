//! The seam to every remote collaborator of a report view.

use std::future::Future;

use api_types::{
    catalog::{CatalogEntry, CatalogQuery},
    export::{ExportBundle, SpreadsheetForm},
    report::ReportPayload,
    rpc::RpcCall,
};

use serde_json::Value;

use crate::ServiceError;

/// Remote side of a report view: catalog lookup, report calls, record reads
/// and the two export services.
///
/// Exports are fire and forget; nothing they return reaches the view.
pub trait ReportService {
    fn search_catalog(
        &self,
        query: &CatalogQuery,
    ) -> impl Future<Output = Result<Vec<CatalogEntry>, ServiceError>> + Send;

    fn call_report(
        &self,
        call: &RpcCall,
    ) -> impl Future<Output = Result<ReportPayload, ServiceError>> + Send;

    /// Read `fields` of the records `ids` of `model`.
    fn read_records(
        &self,
        model: &str,
        ids: &[i64],
        fields: &[&str],
    ) -> impl Future<Output = Result<Vec<Value>, ServiceError>> + Send;

    fn render_document(
        &self,
        report_name: &str,
        bundle: &ExportBundle,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    fn download_spreadsheet(
        &self,
        form: &SpreadsheetForm,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;
}
