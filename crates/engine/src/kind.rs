//! Static description of the six report kinds.
//!
//! Every report view runs the same pipeline; what differs between an aged
//! payable and a general ledger is captured here: remote model and methods,
//! reserved payload keys, which totals fields are summed, which catalogs and
//! options the view offers.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    AgedPayable,
    AgedReceivable,
    BankBook,
    CashBook,
    GeneralLedger,
    PartnerLedger,
}

/// A selectable entity family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    Partners,
    Accounts,
    Journals,
    Analytics,
}

/// Where a catalog comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatalogSource {
    /// `search_read` on a model, optionally restricted to `rank_field > 0`.
    SearchRead {
        model: &'static str,
        rank_field: Option<&'static str>,
    },
    /// A key of the report's initialization payload.
    InitPayload { key: &'static str },
}

/// Whether the report filters on a period or on a single "as of" date.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateMode {
    Range,
    AsOf,
}

/// Which RPC argument a boolean option is sent in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionGroup {
    /// `options`, e.g. `{"draft": true}`.
    Options,
    /// `method`, exactly one of accrual/cash.
    Method,
    /// partner ledger account-type toggles.
    AccountType,
}

/// Named boolean switches a view may offer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportOption {
    Draft,
    Receivable,
    Payable,
    Accrual,
    Cash,
}

impl ReportOption {
    /// Key used in the RPC argument maps.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Receivable => "Receivable",
            Self::Payable => "Payable",
            Self::Accrual => "accrual",
            Self::Cash => "cash",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Receivable => "Receivable",
            Self::Payable => "Payable",
            Self::Accrual => "Accrual basis",
            Self::Cash => "Cash basis",
        }
    }

    pub const fn group(self) -> OptionGroup {
        match self {
            Self::Draft => OptionGroup::Options,
            Self::Receivable | Self::Payable => OptionGroup::AccountType,
            Self::Accrual | Self::Cash => OptionGroup::Method,
        }
    }

    /// The other half of a mutually exclusive pair.
    pub const fn exclusive_with(self) -> Option<ReportOption> {
        match self {
            Self::Accrual => Some(Self::Cash),
            Self::Cash => Some(Self::Accrual),
            _ => None,
        }
    }
}

impl FromStr for ReportOption {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "receivable" => Ok(Self::Receivable),
            "payable" => Ok(Self::Payable),
            "accrual" => Ok(Self::Accrual),
            "cash" | "cash-basis" | "cashbasis" => Ok(Self::Cash),
            other => Err(EngineError::UnknownOption(other.to_string())),
        }
    }
}

/// A totals field summed into the grand total.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AmountField {
    /// Field name inside each per-group totals record.
    pub source: &'static str,
    /// Name of the grand-total figure.
    pub total: &'static str,
}

/// Opening balance folded into another totals field (partner ledger).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpeningBalance {
    pub field: &'static str,
    pub into: &'static str,
}

#[derive(Debug)]
pub struct ReportSpec {
    pub kind: ReportKind,
    pub title: &'static str,
    pub model: &'static str,
    pub init_method: &'static str,
    pub filter_method: &'static str,
    /// Reserved key carrying the per-group totals mapping.
    pub totals_key: &'static str,
    /// Reserved keys carrying catalogs; never displayed as groups.
    pub catalog_keys: &'static [&'static str],
    pub amount_fields: &'static [AmountField],
    pub opening_balance: Option<OpeningBalance>,
    pub date_mode: DateMode,
    pub document_report: &'static str,
    pub catalogs: &'static [(CatalogKind, CatalogSource)],
    pub options: &'static [ReportOption],
    /// Aged reports filter on one partner at a time.
    pub single_partner: bool,
    /// Rows carry `analytic_line_ids` to be labelled with analytic account
    /// names.
    pub analytic_labels: bool,
}

const fn amount(source: &'static str, total: &'static str) -> AmountField {
    AmountField { source, total }
}

const fn payload_key(key: &'static str) -> CatalogSource {
    CatalogSource::InitPayload { key }
}

const AGING_PAYABLE: &[AmountField] = &[
    amount("credit_sum", "total_credit"),
    amount("diff0_sum", "diff0_sum"),
    amount("diff1_sum", "diff1_sum"),
    amount("diff2_sum", "diff2_sum"),
    amount("diff3_sum", "diff3_sum"),
    amount("diff4_sum", "diff4_sum"),
    amount("diff5_sum", "diff5_sum"),
];

const AGING_RECEIVABLE: &[AmountField] = &[
    amount("debit_sum", "total_debit"),
    amount("diff0_sum", "diff0_sum"),
    amount("diff1_sum", "diff1_sum"),
    amount("diff2_sum", "diff2_sum"),
    amount("diff3_sum", "diff3_sum"),
    amount("diff4_sum", "diff4_sum"),
    amount("diff5_sum", "diff5_sum"),
];

const DEBIT_CREDIT: &[AmountField] = &[
    amount("total_debit", "total_debit"),
    amount("total_credit", "total_credit"),
];

const SUPPLIERS: CatalogSource = CatalogSource::SearchRead {
    model: "res.partner",
    rank_field: Some("supplier_rank"),
};

const CUSTOMERS: CatalogSource = CatalogSource::SearchRead {
    model: "res.partner",
    rank_field: Some("customer_rank"),
};

const ALL_PARTNERS: CatalogSource = CatalogSource::SearchRead {
    model: "res.partner",
    rank_field: None,
};

static AGED_PAYABLE: ReportSpec = ReportSpec {
    kind: ReportKind::AgedPayable,
    title: "Aged Payable",
    model: "age.payable.report",
    init_method: "view_report",
    filter_method: "get_filter_values",
    totals_key: "partner_totals",
    catalog_keys: &[],
    amount_fields: AGING_PAYABLE,
    opening_balance: None,
    date_mode: DateMode::AsOf,
    document_report: "dynamic_accounts_report.aged_payable",
    catalogs: &[(CatalogKind::Partners, SUPPLIERS)],
    options: &[],
    single_partner: true,
    analytic_labels: false,
};

static AGED_RECEIVABLE: ReportSpec = ReportSpec {
    kind: ReportKind::AgedReceivable,
    title: "Aged Receivable",
    model: "age.receivable.report",
    init_method: "view_report",
    filter_method: "get_filter_values",
    totals_key: "partner_totals",
    catalog_keys: &[],
    amount_fields: AGING_RECEIVABLE,
    opening_balance: None,
    date_mode: DateMode::AsOf,
    document_report: "dynamic_accounts_report.aged_receivable",
    catalogs: &[(CatalogKind::Partners, CUSTOMERS)],
    options: &[],
    single_partner: true,
    analytic_labels: false,
};

static BANK_BOOK: ReportSpec = ReportSpec {
    kind: ReportKind::BankBook,
    title: "Bank Book",
    model: "bank.book.report",
    init_method: "view_report_bank",
    filter_method: "get_filter_values",
    totals_key: "move_lines_total",
    catalog_keys: &["accounts"],
    amount_fields: DEBIT_CREDIT,
    opening_balance: None,
    date_mode: DateMode::Range,
    document_report: "dynamic_accounts_report.bank_book",
    catalogs: &[
        (CatalogKind::Partners, ALL_PARTNERS),
        (CatalogKind::Accounts, payload_key("accounts")),
    ],
    options: &[ReportOption::Draft],
    single_partner: false,
    analytic_labels: false,
};

static CASH_BOOK: ReportSpec = ReportSpec {
    kind: ReportKind::CashBook,
    title: "Cash Book",
    model: "cash.book.report",
    init_method: "view_report_cash",
    filter_method: "get_filter_values",
    totals_key: "move_lines_total",
    catalog_keys: &["accounts"],
    amount_fields: DEBIT_CREDIT,
    opening_balance: None,
    date_mode: DateMode::Range,
    document_report: "dynamic_accounts_report.cash_book",
    catalogs: &[
        (CatalogKind::Partners, ALL_PARTNERS),
        (CatalogKind::Accounts, payload_key("accounts")),
    ],
    options: &[ReportOption::Draft],
    single_partner: false,
    analytic_labels: false,
};

static GENERAL_LEDGER: ReportSpec = ReportSpec {
    kind: ReportKind::GeneralLedger,
    title: "General Ledger",
    model: "account.general.ledger",
    init_method: "view_report",
    filter_method: "get_filter_values",
    totals_key: "account_totals",
    catalog_keys: &["journal_ids", "analytic_ids", "account_ids"],
    amount_fields: DEBIT_CREDIT,
    opening_balance: None,
    date_mode: DateMode::Range,
    document_report: "dynamic_accounts_report.general_ledger",
    catalogs: &[
        (CatalogKind::Accounts, payload_key("account_ids")),
        (CatalogKind::Journals, payload_key("journal_ids")),
        (CatalogKind::Analytics, payload_key("analytic_ids")),
    ],
    options: &[
        ReportOption::Draft,
        ReportOption::Accrual,
        ReportOption::Cash,
    ],
    single_partner: false,
    analytic_labels: true,
};

static PARTNER_LEDGER: ReportSpec = ReportSpec {
    kind: ReportKind::PartnerLedger,
    title: "Partner Ledger",
    model: "account.partner.ledger",
    init_method: "view_report",
    filter_method: "get_filter_values",
    totals_key: "partner_totals",
    catalog_keys: &[],
    amount_fields: DEBIT_CREDIT,
    opening_balance: Some(OpeningBalance {
        field: "initial_balance",
        into: "total_debit",
    }),
    date_mode: DateMode::Range,
    document_report: "dynamic_accounts_report.partner_ledger",
    catalogs: &[(CatalogKind::Partners, SUPPLIERS)],
    options: &[
        ReportOption::Draft,
        ReportOption::Receivable,
        ReportOption::Payable,
    ],
    single_partner: false,
    analytic_labels: false,
};

impl ReportKind {
    pub const ALL: [ReportKind; 6] = [
        Self::AgedPayable,
        Self::AgedReceivable,
        Self::BankBook,
        Self::CashBook,
        Self::GeneralLedger,
        Self::PartnerLedger,
    ];

    pub fn spec(self) -> &'static ReportSpec {
        match self {
            Self::AgedPayable => &AGED_PAYABLE,
            Self::AgedReceivable => &AGED_RECEIVABLE,
            Self::BankBook => &BANK_BOOK,
            Self::CashBook => &CASH_BOOK,
            Self::GeneralLedger => &GENERAL_LEDGER,
            Self::PartnerLedger => &PARTNER_LEDGER,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AgedPayable => "aged_payable",
            Self::AgedReceivable => "aged_receivable",
            Self::BankBook => "bank_book",
            Self::CashBook => "cash_book",
            Self::GeneralLedger => "general_ledger",
            Self::PartnerLedger => "partner_ledger",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| EngineError::UnknownKind(s.to_string()))
    }
}

impl ReportSpec {
    pub fn catalog_source(&self, catalog: CatalogKind) -> Option<CatalogSource> {
        self.catalogs
            .iter()
            .find_map(|(kind, source)| (*kind == catalog).then_some(*source))
    }

    pub fn offers(&self, catalog: CatalogKind) -> bool {
        self.catalog_source(catalog).is_some()
    }

    /// Whether `key` is a reserved payload key rather than a group.
    pub fn is_reserved_key(&self, key: &str) -> bool {
        key == self.totals_key || self.catalog_keys.contains(&key)
    }

    /// Options switched on when the view is created: accrual basis and both
    /// partner ledger account types.
    pub fn default_options(&self) -> impl Iterator<Item = ReportOption> + '_ {
        self.options
            .iter()
            .copied()
            .filter(|option| {
                option.group() != OptionGroup::Options && *option != ReportOption::Cash
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse_from_their_names() {
        for kind in ReportKind::ALL {
            assert_eq!(kind.as_str().parse::<ReportKind>().unwrap(), kind);
        }
        assert_eq!(
            "general-ledger".parse::<ReportKind>().unwrap(),
            ReportKind::GeneralLedger
        );
        assert!("trial_balance".parse::<ReportKind>().is_err());
    }

    #[test]
    fn aged_reports_carry_six_aging_buckets() {
        for kind in [ReportKind::AgedPayable, ReportKind::AgedReceivable] {
            let buckets = kind
                .spec()
                .amount_fields
                .iter()
                .filter(|field| field.source.starts_with("diff"))
                .count();
            assert_eq!(buckets, 6);
            assert_eq!(kind.spec().date_mode, DateMode::AsOf);
        }
    }

    #[test]
    fn general_ledger_reserves_catalog_keys() {
        let spec = ReportKind::GeneralLedger.spec();
        assert!(spec.is_reserved_key("account_totals"));
        assert!(spec.is_reserved_key("journal_ids"));
        assert!(!spec.is_reserved_key("400000 Sales"));
        assert_eq!(
            spec.default_options().collect::<Vec<_>>(),
            vec![ReportOption::Accrual]
        );
    }
}
