//! Filter state of one report view and the RPC arguments derived from it.

use std::collections::BTreeSet;

use api_types::export::FilterDescription;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::{
    AsOfPreset, CatalogKind, Catalogs, DatePreset, DateRangeError, DateSelection, EngineError,
    OptionGroup, RawRange, ReportKind, ReportOption, ReportSpec, ResolvedDates, ResultEngine,
    dates::{normalize_date, to_canonical, to_display, validate_range},
};

/// A single typed edit of the filter state.
///
/// `None` ids stand for the "All" entry and clear the selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterField {
    StartDate(String),
    EndDate(String),
    Partner(Option<i64>),
    Account(Option<i64>),
    Journal(Option<i64>),
    Analytic(Option<i64>),
    Option(ReportOption),
    AllAccounts,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterState {
    pub(crate) dates: DateSelection,
    pub(crate) partners: Vec<i64>,
    pub(crate) accounts: Vec<i64>,
    pub(crate) journals: Vec<i64>,
    pub(crate) analytics: Vec<i64>,
    pub(crate) options: BTreeSet<ReportOption>,
    pub(crate) accounts_all_selected: bool,
    pub(crate) date_error: Option<DateRangeError>,
}

/// Toggle `id` in `ids`, or clear on the "All" entry.
fn toggle(ids: &mut Vec<i64>, id: Option<i64>) {
    match id {
        None => ids.clear(),
        Some(id) => match ids.iter().position(|x| *x == id) {
            Some(index) => {
                ids.remove(index);
            }
            None => ids.push(id),
        },
    }
}

/// Ids as a JSON list, or `null` when nothing is selected.
fn id_list(ids: &[i64]) -> Value {
    if ids.is_empty() {
        Value::Null
    } else {
        json!(ids)
    }
}

fn names(catalogs: &Catalogs, kind: CatalogKind, ids: &[i64]) -> Vec<String> {
    let Some(catalog) = catalogs.get(&kind) else {
        return Vec::new();
    };
    ids.iter()
        .filter_map(|id| catalog.name_of(*id))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

impl FilterState {
    pub fn new(spec: &ReportSpec) -> Self {
        Self {
            options: spec.default_options().collect(),
            accounts_all_selected: spec.offers(CatalogKind::Accounts),
            ..Self::default()
        }
    }

    pub fn dates(&self) -> &DateSelection {
        &self.dates
    }

    pub fn partners(&self) -> &[i64] {
        &self.partners
    }

    pub fn accounts(&self) -> &[i64] {
        &self.accounts
    }

    pub fn journals(&self) -> &[i64] {
        &self.journals
    }

    pub fn analytics(&self) -> &[i64] {
        &self.analytics
    }

    pub fn options(&self) -> &BTreeSet<ReportOption> {
        &self.options
    }

    pub fn accounts_all_selected(&self) -> bool {
        self.accounts_all_selected
    }

    pub fn date_error(&self) -> Option<DateRangeError> {
        self.date_error
    }

    pub fn set_preset(&mut self, preset: DatePreset) {
        self.dates = DateSelection::Preset(preset);
        self.date_error = None;
    }

    pub fn set_as_of(&mut self, preset: AsOfPreset) {
        self.dates = DateSelection::AsOf(preset);
        self.date_error = None;
    }

    /// Apply one edit. Options the report kind does not offer are rejected.
    pub fn apply(&mut self, spec: &ReportSpec, field: FilterField) -> ResultEngine<()> {
        match field {
            FilterField::StartDate(text) => self.set_boundary(text, true),
            FilterField::EndDate(text) => self.set_boundary(text, false),
            FilterField::Partner(id) if spec.single_partner => {
                if id.is_some() && self.partners.first().copied() == id {
                    self.partners.clear();
                } else {
                    self.partners = id.into_iter().collect();
                }
            }
            FilterField::Partner(id) => toggle(&mut self.partners, id),
            FilterField::Account(id) => {
                toggle(&mut self.accounts, id);
                self.accounts_all_selected = id.is_none();
            }
            FilterField::Journal(id) => toggle(&mut self.journals, id),
            FilterField::Analytic(id) => toggle(&mut self.analytics, id),
            FilterField::Option(option) => {
                if !spec.options.contains(&option) {
                    return Err(EngineError::UnknownOption(option.key().to_string()));
                }
                self.toggle_option(option);
            }
            FilterField::AllAccounts => {
                self.accounts_all_selected = !self.accounts_all_selected;
                if self.accounts_all_selected {
                    self.accounts.clear();
                }
            }
        }
        Ok(())
    }

    fn toggle_option(&mut self, option: ReportOption) {
        match option.exclusive_with() {
            // One of a pair is always on: picking either switches to it.
            Some(other) => {
                self.options.remove(&other);
                self.options.insert(option);
            }
            None => {
                if !self.options.remove(&option) {
                    self.options.insert(option);
                }
            }
        }
    }

    fn set_boundary(&mut self, text: String, start: bool) {
        let mut raw = self.dates.raw().cloned().unwrap_or_default();
        let text = text.trim();
        let value = match text {
            "" => None,
            _ => Some(normalize_date(text).map_or_else(|| text.to_string(), to_canonical)),
        };
        if start {
            raw.start = value;
        } else {
            raw.end = value;
        }
        self.date_error = validate_range(&raw).err();
        self.dates = match (&raw.start, &raw.end) {
            (None, None) => DateSelection::Unbounded,
            _ => DateSelection::Explicit(raw),
        };
    }

    fn options_map(&self, group: OptionGroup) -> Value {
        let map: Map<String, Value> = self
            .options
            .iter()
            .filter(|option| option.group() == group)
            .map(|option| (option.key().to_string(), Value::Bool(true)))
            .collect();
        Value::Object(map)
    }

    fn range_value(dates: ResolvedDates) -> Value {
        match (dates.start, dates.end) {
            (None, None) => Value::Null,
            (start, end) => json!({
                "start_date": start.map(to_canonical),
                "end_date": end.map(to_canonical),
            }),
        }
    }

    fn account_arg(&self) -> Value {
        if self.accounts_all_selected {
            Value::Null
        } else {
            id_list(&self.accounts)
        }
    }

    /// Arguments of the initial unfiltered load.
    pub fn initial_args(&self, spec: &ReportSpec, title: &str) -> Vec<Value> {
        match spec.kind {
            ReportKind::AgedPayable | ReportKind::AgedReceivable => {
                vec![json!(self.partners.first())]
            }
            ReportKind::BankBook | ReportKind::CashBook => Vec::new(),
            ReportKind::GeneralLedger => vec![Value::Null, Value::Null],
            ReportKind::PartnerLedger => vec![json!([]), json!(title)],
        }
    }

    /// Positional arguments of the filter call for `spec`'s kind.
    pub fn filter_args(
        &self,
        spec: &ReportSpec,
        catalogs: &Catalogs,
        dates: ResolvedDates,
    ) -> Vec<Value> {
        let args = match spec.kind {
            ReportKind::AgedPayable | ReportKind::AgedReceivable => {
                let partners: Vec<Value> = self
                    .partners
                    .iter()
                    .map(|id| {
                        let name = catalogs
                            .get(&CatalogKind::Partners)
                            .and_then(|catalog| catalog.name_of(*id));
                        json!({ "id": id, "name": name })
                    })
                    .collect();
                let partners = if partners.is_empty() {
                    Value::Null
                } else {
                    Value::Array(partners)
                };
                vec![json!(dates.end.map(to_canonical)), partners]
            }
            ReportKind::BankBook | ReportKind::CashBook => vec![
                id_list(&self.partners),
                Self::range_value(dates),
                self.account_arg(),
                self.options_map(OptionGroup::Options),
            ],
            ReportKind::GeneralLedger => vec![
                id_list(&self.journals),
                Self::range_value(dates),
                self.options_map(OptionGroup::Options),
                id_list(&self.analytics),
                self.options_map(OptionGroup::Method),
                self.account_arg(),
            ],
            ReportKind::PartnerLedger => vec![
                id_list(&self.partners),
                json!({
                    "start_date": dates.start.map(to_canonical),
                    "end_date": dates.end.map(to_canonical),
                }),
                self.options_map(OptionGroup::AccountType),
                self.options_map(OptionGroup::Options),
            ],
        };
        debug!(kind = %spec.kind, ?args, "built filter arguments");
        args
    }

    /// Names, display dates and option labels for export headers.
    pub fn describe(
        &self,
        spec: &ReportSpec,
        catalogs: &Catalogs,
        dates: ResolvedDates,
    ) -> FilterDescription {
        FilterDescription {
            partner: names(catalogs, CatalogKind::Partners, &self.partners),
            account: if self.accounts_all_selected {
                Vec::new()
            } else {
                names(catalogs, CatalogKind::Accounts, &self.accounts)
            },
            journal: names(catalogs, CatalogKind::Journals, &self.journals),
            analytic: names(catalogs, CatalogKind::Analytics, &self.analytics),
            options: spec
                .options
                .iter()
                .filter(|option| self.options.contains(option))
                .map(|option| option.label().to_string())
                .collect(),
            start_date: dates.start.map(to_display),
            end_date: dates.end.map(to_display),
        }
    }

    /// The explicit range, if the user typed one.
    pub fn raw_range(&self) -> Option<&RawRange> {
        self.dates.raw()
    }
}

#[cfg(test)]
mod tests {
    use api_types::catalog::CatalogEntry;
    use chrono::NaiveDate;

    use super::*;
    use crate::Catalog;

    fn catalogs() -> Catalogs {
        let mut catalogs = Catalogs::new();
        catalogs.insert(
            CatalogKind::Partners,
            Catalog::from_entries(vec![
                CatalogEntry::new(7, "Azure Interior"),
                CatalogEntry::new(9, "Deco Addict"),
            ]),
        );
        catalogs.insert(
            CatalogKind::Accounts,
            Catalog::from_entries(vec![CatalogEntry::new(40, "Bank")]),
        );
        catalogs
    }

    fn dates() -> ResolvedDates {
        ResolvedDates {
            start: NaiveDate::from_ymd_opt(2024, 1, 1),
            end: NaiveDate::from_ymd_opt(2024, 3, 31),
        }
    }

    #[test]
    fn all_entry_clears_selection() {
        let spec = ReportKind::BankBook.spec();
        let mut state = FilterState::new(spec);
        state.apply(spec, FilterField::Partner(Some(7))).unwrap();
        state.apply(spec, FilterField::Partner(Some(9))).unwrap();
        assert_eq!(state.partners(), &[7, 9]);
        state.apply(spec, FilterField::Partner(None)).unwrap();
        assert!(state.partners().is_empty());
        let args = state.filter_args(spec, &catalogs(), dates());
        assert_eq!(args[0], Value::Null);
    }

    #[test]
    fn selecting_twice_deselects() {
        let spec = ReportKind::GeneralLedger.spec();
        let mut state = FilterState::new(spec);
        state.apply(spec, FilterField::Journal(Some(3))).unwrap();
        state.apply(spec, FilterField::Journal(Some(3))).unwrap();
        assert!(state.journals().is_empty());
    }

    #[test]
    fn aged_reports_keep_one_partner() {
        let spec = ReportKind::AgedPayable.spec();
        let mut state = FilterState::new(spec);
        state.apply(spec, FilterField::Partner(Some(7))).unwrap();
        state.apply(spec, FilterField::Partner(Some(9))).unwrap();
        assert_eq!(state.partners(), &[9]);
        let args = state.filter_args(spec, &catalogs(), dates());
        assert_eq!(args[0], json!("2024-03-31"));
        assert_eq!(args[1], json!([{ "id": 9, "name": "Deco Addict" }]));
        assert_eq!(state.initial_args(spec, "Aged Payable"), vec![json!(9)]);
    }

    #[test]
    fn account_flag_overrides_selection() {
        let spec = ReportKind::BankBook.spec();
        let mut state = FilterState::new(spec);
        assert!(state.accounts_all_selected());
        state.apply(spec, FilterField::Account(Some(40))).unwrap();
        assert!(!state.accounts_all_selected());
        assert_eq!(state.filter_args(spec, &catalogs(), dates())[2], json!([40]));
        state.apply(spec, FilterField::AllAccounts).unwrap();
        assert!(state.accounts().is_empty());
        assert_eq!(state.filter_args(spec, &catalogs(), dates())[2], Value::Null);
    }

    #[test]
    fn method_pair_is_exclusive() {
        let spec = ReportKind::GeneralLedger.spec();
        let mut state = FilterState::new(spec);
        state.apply(spec, FilterField::Option(ReportOption::Cash)).unwrap();
        assert!(!state.options().contains(&ReportOption::Accrual));
        let args = state.filter_args(spec, &catalogs(), dates());
        assert_eq!(args[4], json!({ "cash": true }));
        assert_eq!(args[1]["start_date"], json!("2024-01-01"));
    }

    #[test]
    fn unsupported_option_is_rejected() {
        let spec = ReportKind::AgedPayable.spec();
        let mut state = FilterState::new(spec);
        assert_eq!(
            state.apply(spec, FilterField::Option(ReportOption::Draft)),
            Err(EngineError::UnknownOption("draft".to_string()))
        );
    }

    #[test]
    fn typed_dates_are_normalized_and_checked() {
        let spec = ReportKind::PartnerLedger.spec();
        let mut state = FilterState::new(spec);
        state
            .apply(spec, FilterField::StartDate("10/03/2024".to_string()))
            .unwrap();
        state
            .apply(spec, FilterField::EndDate("2024-01-01".to_string()))
            .unwrap();
        assert_eq!(state.date_error(), Some(DateRangeError::EndBeforeStart));
        assert_eq!(
            state.raw_range().and_then(|raw| raw.start.as_deref()),
            Some("2024-03-10")
        );
        state.set_preset(DatePreset::ThisYear);
        assert_eq!(state.date_error(), None);
    }

    #[test]
    fn partner_ledger_sends_account_types() {
        let spec = ReportKind::PartnerLedger.spec();
        let mut state = FilterState::new(spec);
        state
            .apply(spec, FilterField::Option(ReportOption::Payable))
            .unwrap();
        let args = state.filter_args(spec, &catalogs(), dates());
        assert_eq!(args[2], json!({ "Receivable": true }));
        assert_eq!(args[3], json!({}));
    }

    #[test]
    fn description_uses_names_and_display_dates() {
        let spec = ReportKind::BankBook.spec();
        let mut state = FilterState::new(spec);
        state.apply(spec, FilterField::Partner(Some(9))).unwrap();
        state.apply(spec, FilterField::Option(ReportOption::Draft)).unwrap();
        let description = state.describe(spec, &catalogs(), dates());
        assert_eq!(description.partner, vec!["Deco Addict".to_string()]);
        assert!(description.account.is_empty());
        assert_eq!(description.options, vec!["Draft".to_string()]);
        assert_eq!(description.start_date.as_deref(), Some("01/01/2024"));
        assert_eq!(description.end_date.as_deref(), Some("31/03/2024"));
    }
}
