//! Export requests built from the last displayed report.

use api_types::export::{ExportBundle, FilterDescription, SpreadsheetForm};

use crate::{DateRangeError, EngineError, ReportData, ReportSpec, ResultEngine};

pub const SPREADSHEET_FORMAT: &str = "xlsx";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportKind {
    Document,
    Spreadsheet,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExportRequest {
    /// Rendered by the document service under `report_name`.
    Document {
        report_name: String,
        bundle: ExportBundle,
    },
    /// Posted to the spreadsheet download endpoint.
    Spreadsheet(SpreadsheetForm),
}

/// Build the request for `kind`.
///
/// Refused while the date range is invalid or before any report was fetched.
pub fn build_export_request(
    kind: ExportKind,
    spec: &ReportSpec,
    title: &str,
    report: Option<&ReportData>,
    filters: FilterDescription,
    date_error: Option<DateRangeError>,
    report_action: Option<&str>,
) -> ResultEngine<ExportRequest> {
    if let Some(error) = date_error {
        return Err(EngineError::ExportRefused(error.to_string()));
    }
    let report = report.ok_or_else(|| EngineError::ExportRefused("no report loaded".to_string()))?;

    let bundle = ExportBundle {
        title: title.to_string(),
        groups: report.groups.clone(),
        data: report.rows.clone(),
        total: report.totals.clone(),
        grand_total: report.grand_total.to_json(),
        filters,
    };
    Ok(match kind {
        ExportKind::Document => ExportRequest::Document {
            report_name: spec.document_report.to_string(),
            bundle,
        },
        ExportKind::Spreadsheet => ExportRequest::Spreadsheet(SpreadsheetForm {
            model: spec.model.to_string(),
            data: serde_json::to_string(&bundle)?,
            output_format: SPREADSHEET_FORMAT.to_string(),
            report_name: title.to_string(),
            report_action: report_action.map(str::to_string),
        }),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::ReportKind;

    fn report() -> ReportData {
        let payload = json!({
            "Cash": [{ "id": 1, "debit": 10.0 }],
            "move_lines_total": { "Cash": { "total_debit": 10.0, "total_credit": 0.0 } },
        });
        let Value::Object(payload) = payload else {
            unreachable!()
        };
        ReportData::from_payload(ReportKind::CashBook.spec(), &payload)
    }

    #[test]
    fn refused_on_invalid_dates() {
        let got = build_export_request(
            ExportKind::Document,
            ReportKind::CashBook.spec(),
            "Cash Book",
            Some(&report()),
            FilterDescription::default(),
            Some(DateRangeError::EndBeforeStart),
            None,
        );
        assert_eq!(
            got,
            Err(EngineError::ExportRefused("end before start".to_string()))
        );
    }

    #[test]
    fn refused_without_report() {
        let got = build_export_request(
            ExportKind::Spreadsheet,
            ReportKind::CashBook.spec(),
            "Cash Book",
            None,
            FilterDescription::default(),
            None,
            None,
        );
        assert!(matches!(got, Err(EngineError::ExportRefused(_))));
    }

    #[test]
    fn cash_book_document_has_its_own_name() {
        let Ok(ExportRequest::Document { report_name, bundle }) = build_export_request(
            ExportKind::Document,
            ReportKind::CashBook.spec(),
            "Cash Book",
            Some(&report()),
            FilterDescription::default(),
            None,
            None,
        ) else {
            panic!("expected a document request");
        };
        assert_eq!(report_name, "dynamic_accounts_report.cash_book");
        assert_eq!(bundle.groups, vec!["Cash".to_string()]);
        assert_eq!(bundle.grand_total["total_debit"], json!(10.0));
    }

    #[test]
    fn spreadsheet_carries_serialized_bundle() {
        let Ok(ExportRequest::Spreadsheet(form)) = build_export_request(
            ExportKind::Spreadsheet,
            ReportKind::CashBook.spec(),
            "Cash Book",
            Some(&report()),
            FilterDescription::default(),
            None,
            Some("cash_book_action"),
        ) else {
            panic!("expected a spreadsheet request");
        };
        assert_eq!(form.model, "cash.book.report");
        assert_eq!(form.output_format, "xlsx");
        assert_eq!(form.report_action.as_deref(), Some("cash_book_action"));
        let bundle: ExportBundle = serde_json::from_str(&form.data).unwrap();
        assert_eq!(bundle.title, "Cash Book");
        assert_eq!(bundle.data["Cash"][0]["debit"], json!(10.0));
    }
}
