//! Wire types exchanged with the accounting report service.
//!
//! The backend speaks Odoo-flavoured JSON: missing text fields arrive as
//! `false`, report payloads are JSON objects whose key order matters, and
//! every RPC is wrapped in a JSON-RPC 2.0 envelope.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Deserializes an optional text field that the backend may send as `false`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

pub mod catalog {
    use super::*;

    /// A selectable entity: partner, account, journal or analytic account.
    ///
    /// `id == None` is reserved for the synthetic "All" entry, which only
    /// exists on the client side.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CatalogEntry {
        #[serde(default)]
        pub id: Option<i64>,
        #[serde(default, deserialize_with = "lenient_string")]
        pub name: Option<String>,
        #[serde(
            default,
            deserialize_with = "lenient_string",
            skip_serializing_if = "Option::is_none"
        )]
        pub code: Option<String>,
    }

    impl CatalogEntry {
        pub fn new(id: i64, name: &str) -> Self {
            Self {
                id: Some(id),
                name: Some(name.to_string()),
                code: None,
            }
        }

        #[must_use]
        pub fn with_code(mut self, code: &str) -> Self {
            self.code = Some(code.to_string());
            self
        }

        /// Display name, empty when the backend sent none.
        pub fn label(&self) -> &str {
            self.name.as_deref().unwrap_or_default()
        }
    }

    /// `search_read` request for a catalog model.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct CatalogQuery {
        pub model: String,
        /// Odoo domain, e.g. `[["supplier_rank", ">", 0]]`.
        pub domain: Vec<Value>,
        pub fields: Vec<String>,
    }
}

pub mod report {
    use super::*;

    /// Raw report payload: group key -> rows, plus reserved keys carrying
    /// per-group totals and catalogs. Key order is the server's order.
    pub type ReportPayload = Map<String, Value>;
}

pub mod rpc {
    use super::*;

    /// A model method call (`call_kw`).
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct RpcCall {
        pub model: String,
        pub method: String,
        pub args: Vec<Value>,
        #[serde(default)]
        pub kwargs: Map<String, Value>,
    }

    impl RpcCall {
        pub fn new(model: &str, method: &str, args: Vec<Value>) -> Self {
            Self {
                model: model.to_string(),
                method: method.to_string(),
                args,
                kwargs: Map::new(),
            }
        }
    }

    /// JSON-RPC 2.0 request envelope.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct RpcRequest<P> {
        pub jsonrpc: String,
        pub method: String,
        pub id: u64,
        pub params: P,
    }

    impl<P> RpcRequest<P> {
        pub fn call(id: u64, params: P) -> Self {
            Self {
                jsonrpc: "2.0".to_string(),
                method: "call".to_string(),
                id,
                params,
            }
        }
    }

    /// JSON-RPC 2.0 response envelope. Exactly one of `result`/`error` is set.
    #[derive(Debug, Deserialize)]
    #[serde(bound(deserialize = "T: Deserialize<'de>"))]
    pub struct RpcResponse<T> {
        #[serde(default)]
        pub result: Option<T>,
        #[serde(default)]
        pub error: Option<RpcErrorBody>,
    }

    #[derive(Debug, Deserialize)]
    pub struct RpcErrorBody {
        #[serde(default)]
        pub code: i64,
        #[serde(default)]
        pub message: String,
        #[serde(default)]
        pub data: Option<RpcErrorData>,
    }

    #[derive(Debug, Deserialize)]
    pub struct RpcErrorData {
        #[serde(default)]
        pub name: Option<String>,
        #[serde(default)]
        pub message: Option<String>,
    }

    impl RpcErrorBody {
        /// The most specific message available (server exception text first).
        pub fn describe(&self) -> String {
            self.data
                .as_ref()
                .and_then(|data| data.message.clone())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| self.message.clone())
        }
    }

    /// Parameters of `/web/session/authenticate`.
    #[derive(Debug, Serialize)]
    pub struct AuthParams {
        pub db: String,
        pub login: String,
        pub password: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct SessionInfo {
        #[serde(default)]
        pub uid: Option<i64>,
    }
}

pub mod export {
    use super::*;

    /// Human-readable filter description shown on exported documents.
    ///
    /// Entities are listed by name, dates use the `DD/MM/YYYY` display form.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct FilterDescription {
        pub partner: Vec<String>,
        pub account: Vec<String>,
        pub journal: Vec<String>,
        pub analytic: Vec<String>,
        pub options: Vec<String>,
        pub start_date: Option<String>,
        pub end_date: Option<String>,
    }

    /// Everything an export needs: rows, group order, totals and filters.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct ExportBundle {
        pub title: String,
        /// Group keys in display order.
        pub groups: Vec<String>,
        /// Group key -> rows.
        pub data: Map<String, Value>,
        /// Group key -> totals record, as returned by the service.
        pub total: Map<String, Value>,
        pub grand_total: Map<String, Value>,
        pub filters: FilterDescription,
    }

    /// Form body posted to the spreadsheet download endpoint.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SpreadsheetForm {
        pub model: String,
        /// JSON-serialized [`ExportBundle`].
        pub data: String,
        pub output_format: String,
        pub report_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub report_action: Option<String>,
    }
}

#[cfg(test)]
mod tests {
    use super::catalog::CatalogEntry;
    use super::rpc::{RpcErrorBody, RpcResponse};

    #[test]
    fn catalog_entry_accepts_false_for_missing_text() {
        let entry: CatalogEntry =
            serde_json::from_str(r#"{"id": 7, "name": "Bank", "code": false}"#).unwrap();
        assert_eq!(entry.id, Some(7));
        assert_eq!(entry.label(), "Bank");
        assert_eq!(entry.code, None);
    }

    #[test]
    fn rpc_error_prefers_server_message() {
        let response: RpcResponse<serde_json::Value> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":200,"message":"Odoo Server Error",
                "data":{"name":"odoo.exceptions.UserError","message":"Please select a date range"}}}"#,
        )
        .unwrap();
        let error: RpcErrorBody = response.error.unwrap();
        assert_eq!(error.describe(), "Please select a date range");
        assert!(response.result.is_none());
    }
}
