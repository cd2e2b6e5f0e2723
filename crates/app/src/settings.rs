//! Runner settings: an optional TOML file, then `ACCOUNTS_REPORT_*`
//! environment variables, then command line overrides.

use clap::Parser;
use serde::Deserialize;

use crate::error::Result;

const DEFAULT_CONFIG_PATH: &str = "config/accounts_report.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub database: String,
    pub login: String,
    pub password: String,
    pub timezone: String,
    pub output_dir: String,
    pub level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8069".to_string(),
            database: String::new(),
            login: String::new(),
            password: String::new(),
            timezone: "Europe/Madrid".to_string(),
            output_dir: "exports".to_string(),
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "accounts_report", disable_version_flag = true)]
pub struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override base URL (e.g. http://127.0.0.1:8069).
    #[arg(long)]
    base_url: Option<String>,
    /// Override database name.
    #[arg(long)]
    database: Option<String>,
    /// Override login (password is never read from CLI).
    #[arg(long)]
    login: Option<String>,
    /// Override timezone (IANA name).
    #[arg(long)]
    timezone: Option<String>,
    /// Override export directory.
    #[arg(long)]
    output_dir: Option<String>,
    /// Override log level.
    #[arg(long)]
    level: Option<String>,

    /// Report kind, e.g. general_ledger or aged-payable.
    #[arg(long, default_value = "general_ledger")]
    pub kind: String,
    /// Date preset (thisMonth, last-quarter, ...; lastMonthEnd for aged reports).
    #[arg(long)]
    pub preset: Option<String>,
    /// Start date, YYYY-MM-DD or DD/MM/YYYY.
    #[arg(long)]
    pub from: Option<String>,
    /// End date, YYYY-MM-DD or DD/MM/YYYY.
    #[arg(long)]
    pub to: Option<String>,
    /// Partner id; repeat to select several.
    #[arg(long)]
    pub partner: Vec<i64>,
    /// Account id; repeat to select several.
    #[arg(long)]
    pub account: Vec<i64>,
    /// Journal id; repeat to select several.
    #[arg(long)]
    pub journal: Vec<i64>,
    /// Report option to switch (draft, cash, accrual, receivable, payable).
    #[arg(long = "option")]
    pub options: Vec<String>,
    /// Include draft entries.
    #[arg(long)]
    pub draft: bool,
    /// Render the report as PDF.
    #[arg(long)]
    pub pdf: bool,
    /// Download the report as a spreadsheet.
    #[arg(long)]
    pub xlsx: bool,
}

impl Args {
    /// Whether any filter beyond the initial load was requested.
    pub fn has_filters(&self) -> bool {
        self.preset.is_some()
            || self.from.is_some()
            || self.to.is_some()
            || !self.partner.is_empty()
            || !self.account.is_empty()
            || !self.journal.is_empty()
            || !self.options.is_empty()
            || self.draft
    }
}

pub fn load() -> Result<(Settings, Args)> {
    let args = Args::parse();

    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix("ACCOUNTS_REPORT"));
    let mut settings: Settings = builder.build()?.try_deserialize()?;

    if let Some(base_url) = &args.base_url {
        settings.base_url = base_url.clone();
    }
    if let Some(database) = &args.database {
        settings.database = database.clone();
    }
    if let Some(login) = &args.login {
        settings.login = login.clone();
    }
    if let Some(timezone) = &args.timezone {
        settings.timezone = timezone.clone();
    }
    if let Some(output_dir) = &args.output_dir {
        settings.output_dir = output_dir.clone();
    }
    if let Some(level) = &args.level {
        settings.level = level.clone();
    }

    Ok((settings, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.timezone, "Europe/Madrid");
        assert_eq!(settings.output_dir, "exports");
        assert_eq!(settings.level, "info");
    }

    #[test]
    fn repeated_ids_and_flags_parse() {
        let args = Args::parse_from([
            "accounts_report",
            "--kind",
            "bank_book",
            "--partner",
            "7",
            "--partner",
            "9",
            "--draft",
            "--xlsx",
        ]);
        assert_eq!(args.kind, "bank_book");
        assert_eq!(args.partner, vec![7, 9]);
        assert!(args.draft && args.xlsx && !args.pdf);
        assert!(args.has_filters());
    }

    #[test]
    fn bare_invocation_has_no_filters() {
        let args = Args::parse_from(["accounts_report"]);
        assert_eq!(args.kind, "general_ledger");
        assert!(!args.has_filters());
    }
}
