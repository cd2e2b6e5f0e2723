//! Folding a report payload into display groups and grand totals.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use api_types::report::ReportPayload;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::ReportSpec;

const CURRENCY_FIELD: &str = "currency_id";
const ANALYTIC_LINES_FIELD: &str = "analytic_line_ids";
const ANALYTIC_LABEL_FIELD: &str = "_analytic_label";

/// Sums across every group, rounded to cents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GrandTotal {
    amounts: Vec<(&'static str, Decimal)>,
    currency: Option<String>,
}

impl GrandTotal {
    pub fn get(&self, name: &str) -> Option<Decimal> {
        self.amounts
            .iter()
            .find_map(|(field, amount)| (*field == name).then_some(*amount))
    }

    /// Figures in report order.
    pub fn amounts(&self) -> &[(&'static str, Decimal)] {
        &self.amounts
    }

    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut map: Map<String, Value> = self
            .amounts
            .iter()
            .map(|(name, amount)| (name.to_string(), decimal_to_json(*amount)))
            .collect();
        if let Some(currency) = &self.currency {
            map.insert("currency".to_string(), Value::String(currency.clone()));
        }
        map
    }
}

/// A fetched report: groups in server order, their rows and totals.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReportData {
    pub groups: Vec<String>,
    /// Group key -> rows.
    pub rows: Map<String, Value>,
    /// Group key -> totals record.
    pub totals: Map<String, Value>,
    pub grand_total: GrandTotal,
}

impl ReportData {
    /// Split `payload` into groups and totals and sum the totals.
    ///
    /// Missing or malformed figures count as zero.
    pub fn from_payload(spec: &ReportSpec, payload: &ReportPayload) -> Self {
        let mut groups = Vec::new();
        let mut rows = Map::new();
        let mut totals = Map::new();
        for (key, value) in payload {
            if key == spec.totals_key {
                match value {
                    Value::Object(map) => totals = map.clone(),
                    other => warn!(kind = %spec.kind, key, ?other, "totals entry is not a mapping"),
                }
            } else if !spec.is_reserved_key(key) {
                groups.push(key.clone());
                rows.insert(key.clone(), Value::Array(flatten_rows(value)));
            }
        }
        if !payload.contains_key(spec.totals_key) {
            warn!(kind = %spec.kind, key = spec.totals_key, "payload has no totals entry");
        }

        if let Some(opening) = spec.opening_balance {
            for record in totals.values_mut() {
                fold_opening_balance(record, opening.field, opening.into);
            }
        }
        let grand_total = sum_totals(spec, &totals);
        Self {
            groups,
            rows,
            totals,
            grand_total,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Every analytic line referenced by a row.
    pub fn analytic_line_ids(&self) -> BTreeSet<i64> {
        self.rows
            .values()
            .filter_map(Value::as_array)
            .flatten()
            .flat_map(row_analytic_lines)
            .collect()
    }

    /// Set `_analytic_label` on every row: the distinct account names of its
    /// analytic lines, comma separated, in line order.
    pub fn label_analytic_lines(&mut self, names: &BTreeMap<i64, String>) {
        for rows in self.rows.values_mut() {
            let Value::Array(rows) = rows else {
                continue;
            };
            for row in rows {
                let mut labels: Vec<&str> = Vec::new();
                for id in row_analytic_lines(row) {
                    if let Some(name) = names.get(&id)
                        && !name.is_empty()
                        && !labels.contains(&name.as_str())
                    {
                        labels.push(name);
                    }
                }
                let label = labels.join(", ");
                if let Value::Object(row) = row {
                    row.insert(ANALYTIC_LABEL_FIELD.to_string(), Value::String(label));
                }
            }
        }
    }
}

fn row_analytic_lines(row: &Value) -> Vec<i64> {
    row.get(ANALYTIC_LINES_FIELD)
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default()
}

/// Analytic line id -> analytic account name, from `account.analytic.line`
/// records read with `account_id`. Lines without an account map to "".
pub fn analytic_account_names(records: &[Value]) -> BTreeMap<i64, String> {
    records
        .iter()
        .filter_map(|record| {
            let id = record.get("id")?.as_i64()?;
            let name = record
                .get("account_id")
                .and_then(|account| account.get(1))
                .and_then(Value::as_str)
                .unwrap_or_default();
            Some((id, name.to_string()))
        })
        .collect()
}

/// Rows of one group: nested arrays are flattened one level and remaining
/// array items are replaced by their first element.
pub fn flatten_rows(value: &Value) -> Vec<Value> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .iter()
        .flat_map(|item| match item {
            Value::Array(inner) => inner.clone(),
            other => vec![other.clone()],
        })
        .map(|item| match item {
            Value::Array(inner) => inner.into_iter().next().unwrap_or(Value::Null),
            other => other,
        })
        .collect()
}

/// Parse a totals figure. `None` when present but not numeric.
fn parse_amount(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Read `field` from a totals record; absent counts as zero silently.
fn amount_of(record: &Value, field: &str, group: &str) -> Decimal {
    match record.get(field) {
        None | Some(Value::Null) => Decimal::ZERO,
        Some(value) => parse_amount(value).unwrap_or_else(|| {
            warn!(group, field, ?value, "non-numeric total counted as zero");
            Decimal::ZERO
        }),
    }
}

fn decimal_to_json(amount: Decimal) -> Value {
    amount
        .to_f64()
        .and_then(Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

fn fold_opening_balance(record: &mut Value, field: &str, into: &str) {
    let Some(opening) = record.get(field).and_then(parse_amount) else {
        return;
    };
    let Value::Object(map) = record else {
        return;
    };
    let current = map.get(into).and_then(parse_amount).unwrap_or_default();
    match current.checked_add(opening) {
        Some(folded) => {
            map.insert(into.to_string(), decimal_to_json(folded));
        }
        None => warn!(field, into, %opening, "opening balance overflows, ignored"),
    }
}

/// Currency label of a totals record: a symbol or an `[id, name]` pair.
fn currency_of(record: &Value) -> Option<String> {
    match record.get(CURRENCY_FIELD)? {
        Value::String(symbol) if !symbol.is_empty() => Some(symbol.clone()),
        Value::Array(pair) => pair.get(1).and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn sum_totals(spec: &ReportSpec, totals: &Map<String, Value>) -> GrandTotal {
    let amounts = spec
        .amount_fields
        .iter()
        .map(|field| {
            let sum = totals.iter().fold(Decimal::ZERO, |sum, (group, record)| {
                let amount = amount_of(record, field.source, group);
                sum.checked_add(amount).unwrap_or_else(|| {
                    warn!(
                        group,
                        field = field.source,
                        %amount,
                        "total overflows, counted as zero"
                    );
                    sum
                })
            });
            let mut total =
                sum.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            total.rescale(2);
            (field.total, total)
        })
        .collect();

    let mut keys: Vec<&String> = totals.keys().collect();
    keys.sort();
    let currencies: Vec<String> = keys
        .into_iter()
        .filter_map(|key| currency_of(&totals[key.as_str()]))
        .collect();
    let currency = currencies.first().cloned();
    if let Some(first) = &currency
        && currencies.iter().any(|other| other != first)
    {
        warn!(kind = %spec.kind, currency = first, "totals mix currencies");
    }
    GrandTotal { amounts, currency }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ReportKind;

    fn dec(text: &str) -> Decimal {
        text.parse().unwrap()
    }

    fn payload(value: Value) -> ReportPayload {
        match value {
            Value::Object(map) => map,
            _ => panic!("payload must be an object"),
        }
    }

    #[test]
    fn sums_round_half_away_from_zero() {
        let spec = ReportKind::BankBook.spec();
        let data = ReportData::from_payload(
            spec,
            &payload(json!({
                "A": [],
                "B": [],
                "move_lines_total": {
                    "A": { "total_debit": 10.005, "total_credit": 5 },
                    "B": { "total_debit": 2.0, "total_credit": 3.0 },
                },
            })),
        );
        assert_eq!(data.grand_total.get("total_debit"), Some(dec("12.01")));
        assert_eq!(data.grand_total.get("total_credit"), Some(dec("8.00")));
        assert_eq!(data.groups, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn totals_key_and_catalog_keys_are_not_groups() {
        let spec = ReportKind::GeneralLedger.spec();
        let data = ReportData::from_payload(
            spec,
            &payload(json!({
                "600000 Expenses": [],
                "journal_ids": [{ "id": 1, "name": "Bank" }],
                "400000 Sales": [],
                "account_totals": {},
            })),
        );
        assert_eq!(
            data.groups,
            vec!["600000 Expenses".to_string(), "400000 Sales".to_string()]
        );
    }

    #[test]
    fn missing_or_malformed_fields_count_as_zero() {
        let spec = ReportKind::AgedPayable.spec();
        let data = ReportData::from_payload(
            spec,
            &payload(json!({
                "Azure": [],
                "partner_totals": {
                    "Azure": { "credit_sum": "12.50", "diff0_sum": false },
                    "Deco": { "diff1_sum": 4 },
                },
            })),
        );
        let total = &data.grand_total;
        assert_eq!(total.get("total_credit"), Some(dec("12.50")));
        assert_eq!(total.get("diff0_sum"), Some(Decimal::ZERO));
        assert_eq!(total.get("diff1_sum"), Some(dec("4")));
        assert_eq!(total.amounts().len(), 7);
    }

    #[test]
    fn missing_totals_entry_yields_zero_totals() {
        let spec = ReportKind::CashBook.spec();
        let data = ReportData::from_payload(spec, &payload(json!({ "Cash": [] })));
        assert_eq!(data.grand_total.get("total_debit"), Some(Decimal::ZERO));
        assert_eq!(data.groups.len(), 1);
    }

    #[test]
    fn opening_balance_folds_into_debit() {
        let spec = ReportKind::PartnerLedger.spec();
        let data = ReportData::from_payload(
            spec,
            &payload(json!({
                "Azure": [],
                "partner_totals": {
                    "Azure": {
                        "total_debit": 100.0,
                        "total_credit": 20.0,
                        "initial_balance": 50.25,
                    },
                    "Deco": { "total_debit": 1.0, "initial_balance": "n/a" },
                },
            })),
        );
        assert_eq!(data.grand_total.get("total_debit"), Some(dec("151.25")));
        assert_eq!(data.totals["Azure"]["total_debit"], json!(150.25));
        assert_eq!(data.totals["Deco"]["total_debit"], json!(1.0));
    }

    #[test]
    fn currency_comes_from_lowest_group_key() {
        let spec = ReportKind::AgedReceivable.spec();
        let data = ReportData::from_payload(
            spec,
            &payload(json!({
                "partner_totals": {
                    "Zeta": { "currency_id": "$" },
                    "Alpha": { "currency_id": [1, "EUR"] },
                    "Beta": {},
                },
            })),
        );
        assert_eq!(data.grand_total.currency(), Some("EUR"));
        assert_eq!(data.grand_total.to_json()["currency"], json!("EUR"));
    }

    #[test]
    fn order_of_groups_does_not_change_sums() {
        let spec = ReportKind::BankBook.spec();
        let records = [
            ("A", 0.1, 7.335),
            ("B", 0.2, 1.005),
            ("C", 0.3, 2.115),
            ("D", 1234.565, 0.0),
        ];
        let build = |order: &[usize]| {
            let mut totals = Map::new();
            for index in order {
                let (key, debit, credit) = records[*index];
                totals.insert(
                    key.to_string(),
                    json!({ "total_debit": debit, "total_credit": credit }),
                );
            }
            let mut raw = Map::new();
            raw.insert("move_lines_total".to_string(), Value::Object(totals));
            ReportData::from_payload(spec, &raw).grand_total
        };
        let expected = build(&[0, 1, 2, 3]);
        for order in [[3, 2, 1, 0], [1, 3, 0, 2], [2, 0, 3, 1]] {
            assert_eq!(build(&order), expected);
        }
    }

    #[test]
    fn overflowing_figures_are_dropped() {
        let spec = ReportKind::BankBook.spec();
        let data = ReportData::from_payload(
            spec,
            &payload(json!({
                "move_lines_total": {
                    "A": { "total_debit": 5e28, "total_credit": 1 },
                    "B": { "total_debit": 5e28, "total_credit": 2 },
                },
            })),
        );
        assert_eq!(
            data.grand_total.get("total_debit"),
            Decimal::from_scientific("5e28").ok()
        );
        assert_eq!(data.grand_total.get("total_credit"), Some(dec("3.00")));

        let spec = ReportKind::PartnerLedger.spec();
        let data = ReportData::from_payload(
            spec,
            &payload(json!({
                "partner_totals": {
                    "Azure": { "total_debit": 7.9e28, "initial_balance": 7.9e28 },
                },
            })),
        );
        assert_eq!(data.totals["Azure"]["total_debit"], json!(7.9e28));
    }

    #[test]
    fn analytic_labels_use_distinct_account_names() {
        let spec = ReportKind::GeneralLedger.spec();
        let mut data = ReportData::from_payload(
            spec,
            &payload(json!({
                "600000 Expenses": [[
                    { "id": 1, "analytic_line_ids": [11, 12, 13] },
                    { "id": 2 },
                ]],
                "account_totals": {},
            })),
        );
        assert_eq!(data.analytic_line_ids(), BTreeSet::from([11, 12, 13]));

        let names = analytic_account_names(&[
            json!({ "id": 11, "account_id": [5, "Marketing"] }),
            json!({ "id": 12, "account_id": [5, "Marketing"] }),
            json!({ "id": 13, "account_id": false }),
            json!({ "id": 14, "account_id": [6, "Sales"] }),
        ]);
        assert_eq!(names[&13], "");
        data.label_analytic_lines(&names);

        let rows = data.rows["600000 Expenses"].as_array().unwrap();
        assert_eq!(rows[0]["_analytic_label"], json!("Marketing"));
        assert_eq!(rows[1]["_analytic_label"], json!(""));
    }

    #[test]
    fn nested_rows_are_flattened() {
        let rows = flatten_rows(&json!([[{ "id": 1 }], [[{ "id": 2 }, "extra"]], { "id": 3 }]));
        assert_eq!(rows, vec![json!({ "id": 1 }), json!({ "id": 2 }), json!({ "id": 3 })]);
        assert!(flatten_rows(&json!(false)).is_empty());
    }
}
