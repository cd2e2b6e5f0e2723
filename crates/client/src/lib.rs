//! JSON-RPC client for an Odoo-style accounting backend.
//!
//! [`OdooClient`] logs in once, keeps the session cookie and implements
//! [`ReportService`] so a report view can run against a live server.
//! Exports are downloaded into the configured output directory.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use api_types::{
    catalog::{CatalogEntry, CatalogQuery},
    export::{ExportBundle, SpreadsheetForm},
    report::ReportPayload,
    rpc::{AuthParams, RpcCall, RpcRequest, RpcResponse, SessionInfo},
};
use chrono::Local;
use engine::{ReportService, ServiceError};
use reqwest::{Client, Url};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, info};

pub use error::{ClientError, Result};

mod error;

const AUTH_PATH: &str = "/web/session/authenticate";
const CALL_KW_PATH: &str = "/web/dataset/call_kw";
const REPORT_PATH: &str = "/report/pdf";
const SPREADSHEET_PATH: &str = "/xlsx_report";

#[derive(Debug)]
pub struct OdooClient {
    http: Client,
    base_url: String,
    database: String,
    login: String,
    password: String,
    output_dir: PathBuf,
    next_id: AtomicU64,
}

impl OdooClient {
    /// Return a builder for `OdooClient`.
    pub fn builder() -> OdooClientBuilder {
        OdooClientBuilder::default()
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Open a session. The session cookie is kept by the HTTP client.
    pub async fn authenticate(&self) -> Result<i64> {
        let params = AuthParams {
            db: self.database.clone(),
            login: self.login.clone(),
            password: self.password.clone(),
        };
        let session: SessionInfo = self.json_rpc(AUTH_PATH, &params).await?;
        let uid = session
            .uid
            .ok_or_else(|| ClientError::Unauthorized(self.login.clone()))?;
        info!(uid, database = %self.database, "session opened");
        Ok(uid)
    }

    async fn json_rpc<P, T>(&self, path: &str, params: &P) -> Result<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let resp = self
            .http
            .post(self.url(path))
            .json(&RpcRequest::call(id, params))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .text()
                .await
                .unwrap_or_else(|_| "server error".to_string());
            return Err(ClientError::Server { status, message });
        }
        decode_response(resp.json::<RpcResponse<T>>().await?)
    }

    /// Call a model method.
    pub async fn call_kw<T: DeserializeOwned>(&self, call: &RpcCall) -> Result<T> {
        debug!(model = %call.model, method = %call.method, "call_kw");
        let path = format!("{CALL_KW_PATH}/{}/{}", call.model, call.method);
        self.json_rpc(&path, call).await
    }

    pub async fn search_read(&self, query: &CatalogQuery) -> Result<Vec<CatalogEntry>> {
        let call = RpcCall::new(
            &query.model,
            "search_read",
            vec![json!(query.domain), json!(query.fields)],
        );
        self.call_kw(&call).await
    }

    /// `read` on a model by ids.
    pub async fn read(&self, model: &str, ids: &[i64], fields: &[&str]) -> Result<Vec<Value>> {
        let call = RpcCall::new(model, "read", vec![json!(ids), json!(fields)]);
        self.call_kw(&call).await
    }

    /// POST a form and save the response body under `file_name`.
    async fn download<F: Serialize + ?Sized>(
        &self,
        path: &str,
        form: &F,
        file_name: &str,
    ) -> Result<PathBuf> {
        let resp = self.http.post(self.url(path)).form(form).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .text()
                .await
                .unwrap_or_else(|_| "server error".to_string());
            return Err(ClientError::Server { status, message });
        }
        let bytes = resp.bytes().await?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let target = self.output_dir.join(file_name);
        tokio::fs::write(&target, &bytes).await?;
        info!(path = %target.display(), size = bytes.len(), "export saved");
        Ok(target)
    }

    /// Render a document report to PDF.
    pub async fn download_document(
        &self,
        report_name: &str,
        bundle: &ExportBundle,
    ) -> Result<PathBuf> {
        let options = serde_json::to_string(bundle)?;
        let file_name = export_file_name(&bundle.title, "pdf");
        self.download(
            &format!("{REPORT_PATH}/{report_name}"),
            &[("options", options.as_str())],
            &file_name,
        )
        .await
    }

    pub async fn download_xlsx(&self, form: &SpreadsheetForm) -> Result<PathBuf> {
        let file_name = export_file_name(&form.report_name, "xlsx");
        self.download(SPREADSHEET_PATH, form, &file_name).await
    }
}

/// Unwrap a JSON-RPC envelope.
fn decode_response<T>(response: RpcResponse<T>) -> Result<T> {
    if let Some(error) = response.error {
        return Err(ClientError::Rpc(error.describe()));
    }
    response
        .result
        .ok_or_else(|| ClientError::Malformed("response has neither result nor error".to_string()))
}

/// `<title>_<timestamp>.<extension>` with the title reduced to a safe stem.
fn export_file_name(title: &str, extension: &str) -> String {
    let mut stem = String::new();
    for ch in title.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            stem.push(ch.to_ascii_lowercase());
        } else if !stem.is_empty() && !stem.ends_with('_') {
            stem.push('_');
        }
    }
    let stem = stem.trim_end_matches('_');
    let stem = if stem.is_empty() { "report" } else { stem };
    format!("{stem}_{}.{extension}", Local::now().format("%Y%m%d_%H%M%S"))
}

impl ReportService for OdooClient {
    async fn search_catalog(
        &self,
        query: &CatalogQuery,
    ) -> std::result::Result<Vec<CatalogEntry>, ServiceError> {
        Ok(self.search_read(query).await?)
    }

    async fn call_report(
        &self,
        call: &RpcCall,
    ) -> std::result::Result<ReportPayload, ServiceError> {
        Ok(self.call_kw(call).await?)
    }

    async fn read_records(
        &self,
        model: &str,
        ids: &[i64],
        fields: &[&str],
    ) -> std::result::Result<Vec<Value>, ServiceError> {
        Ok(self.read(model, ids, fields).await?)
    }

    async fn render_document(
        &self,
        report_name: &str,
        bundle: &ExportBundle,
    ) -> std::result::Result<(), ServiceError> {
        self.download_document(report_name, bundle).await?;
        Ok(())
    }

    async fn download_spreadsheet(
        &self,
        form: &SpreadsheetForm,
    ) -> std::result::Result<(), ServiceError> {
        self.download_xlsx(form).await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct OdooClientBuilder {
    base_url: Option<String>,
    database: String,
    login: String,
    password: String,
    output_dir: Option<PathBuf>,
}

impl OdooClientBuilder {
    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_string());
        self
    }

    pub fn credentials(mut self, database: &str, login: &str, password: &str) -> Self {
        self.database = database.to_string();
        self.login = login.to_string();
        self.password = password.to_string();
        self
    }

    /// Where exports are saved. Defaults to `exports`.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> Result<OdooClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::InvalidUrl("missing base_url".to_string()))?;
        Url::parse(&base_url).map_err(|err| ClientError::InvalidUrl(err.to_string()))?;
        let http = Client::builder().cookie_store(true).build()?;
        Ok(OdooClient {
            http,
            base_url,
            database: self.database,
            login: self.login,
            password: self.password,
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from("exports")),
            next_id: AtomicU64::new(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OdooClient {
        OdooClient::builder()
            .base_url("http://localhost:8069/")
            .credentials("odoo", "admin", "admin")
            .build()
            .unwrap()
    }

    #[test]
    fn url_joins_without_double_slash() {
        let client = client();
        assert_eq!(
            client.url("/web/dataset/call_kw"),
            "http://localhost:8069/web/dataset/call_kw"
        );
        assert_eq!(client.output_dir(), Path::new("exports"));
    }

    #[test]
    fn builder_rejects_bad_url() {
        let err = OdooClient::builder().base_url("not a url").build();
        assert!(matches!(err, Err(ClientError::InvalidUrl(_))));
        assert!(matches!(
            OdooClient::builder().build(),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn rpc_error_becomes_service_error() {
        let response: RpcResponse<ReportPayload> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":3,"error":{"code":200,"message":"Odoo Server Error",
                "data":{"name":"odoo.exceptions.AccessError","message":"Access denied"}}}"#,
        )
        .unwrap();
        let err = decode_response(response).unwrap_err();
        assert_eq!(
            ServiceError::from(err),
            ServiceError::Rpc("Access denied".to_string())
        );
    }

    #[test]
    fn empty_envelope_is_malformed() {
        let response: RpcResponse<ReportPayload> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":4}"#).unwrap();
        assert!(matches!(
            decode_response(response),
            Err(ClientError::Malformed(_))
        ));
    }

    #[test]
    fn export_file_names_are_safe() {
        let name = export_file_name("Aged Payable / Q1", "xlsx");
        assert!(name.starts_with("aged_payable_q1_"));
        assert!(name.ends_with(".xlsx"));
        assert!(export_file_name("***", "pdf").starts_with("report_"));
    }
}
