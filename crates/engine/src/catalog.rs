//! Selectable entity lists with the synthetic "All" entry.

use std::collections::BTreeMap;

use api_types::catalog::{CatalogEntry, CatalogQuery};
use serde_json::{Value, json};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::CatalogKind;

pub const ALL_LABEL: &str = "All";

/// Catalogs a view has loaded, by entity family.
pub type Catalogs = BTreeMap<CatalogKind, Catalog>;

/// The UI-only `{id: null, name: "All"}` entry.
pub fn all_entry() -> CatalogEntry {
    CatalogEntry {
        id: None,
        name: Some(ALL_LABEL.to_string()),
        code: None,
    }
}

/// Case and accent insensitive search key.
///
/// Runs of separators collapse into one space so `"Cash-Bank"` matches
/// `"cash bank"`.
pub(crate) fn normalize_key(input: &str) -> String {
    let mut out = String::new();
    let mut prev_space = false;
    for ch in input.trim().nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            prev_space = false;
        } else if !out.is_empty() && !prev_space {
            out.push(' ');
            prev_space = true;
        }
    }
    out.trim_end().to_string()
}

/// Entries whose name or code contains `query`. The "All" entry stays first.
///
/// A blank query keeps every entry. A query made only of separators is
/// matched literally, ignoring case.
pub fn filter_catalog(entries: &[CatalogEntry], query: &str) -> Vec<CatalogEntry> {
    let query = query.trim();
    let needle = normalize_key(query);
    let literal = query.to_lowercase();
    let matches = |text: &str| {
        if needle.is_empty() {
            text.to_lowercase().contains(&literal)
        } else {
            normalize_key(text).contains(&needle)
        }
    };
    let mut out = vec![all_entry()];
    out.extend(
        entries
            .iter()
            .filter(|entry| entry.id.is_some())
            .filter(|entry| {
                query.is_empty()
                    || matches(entry.label())
                    || entry.code.as_deref().is_some_and(|code| matches(code))
            })
            .cloned(),
    );
    out
}

/// `search_read` request for a catalog model.
pub fn search_query(model: &str, rank_field: Option<&str>) -> CatalogQuery {
    let domain: Vec<Value> = rank_field
        .map(|field| vec![json!([field, ">", 0])])
        .unwrap_or_default();
    CatalogQuery {
        model: model.to_string(),
        domain,
        fields: vec!["id".to_string(), "name".to_string()],
    }
}

/// Parse a catalog carried inside a report payload. Unparsable items are
/// skipped.
pub(crate) fn entries_from_value(value: &Value) -> Vec<CatalogEntry> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value::<CatalogEntry>(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    filtered: Vec<CatalogEntry>,
    query: String,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::from_entries(Vec::new())
    }
}

impl Catalog {
    /// Wrap server entries, in server order, behind the "All" entry.
    /// Server entries without an id are dropped.
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        let mut all = vec![all_entry()];
        all.extend(entries.into_iter().filter(|entry| entry.id.is_some()));
        Self {
            filtered: all.clone(),
            entries: all,
            query: String::new(),
        }
    }

    /// Every entry, "All" first.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// The current search result, "All" first.
    pub fn filtered(&self) -> &[CatalogEntry] {
        &self.filtered
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn search(&mut self, query: &str) -> &[CatalogEntry] {
        self.query = query.to_string();
        self.filtered = filter_catalog(&self.entries[1..], query);
        &self.filtered
    }

    pub fn get(&self, id: i64) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.id == Some(id))
    }

    pub fn name_of(&self, id: i64) -> Option<&str> {
        self.get(id).map(CatalogEntry::label)
    }

    /// Number of real entries, "All" excluded.
    pub fn len(&self) -> usize {
        self.entries.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Catalog {
        Catalog::from_entries(vec![
            CatalogEntry::new(1, "Azure Interior"),
            CatalogEntry::new(2, "Deco Addict"),
            CatalogEntry::new(3, "Gémini Furniture").with_code("GEM"),
        ])
    }

    #[test]
    fn all_entry_is_prepended() {
        let catalog = sample();
        assert_eq!(catalog.entries()[0], all_entry());
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.name_of(2), Some("Deco Addict"));
    }

    #[test]
    fn empty_query_keeps_everything() {
        let mut catalog = sample();
        let entries = catalog.entries().to_vec();
        assert_eq!(catalog.search(""), entries.as_slice());
    }

    #[test]
    fn search_is_case_and_accent_insensitive() {
        let mut catalog = sample();
        let ids: Vec<_> = catalog.search("GEMINI").iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![None, Some(3)]);
        let ids: Vec<_> = catalog.search("gem").iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![None, Some(3)]);
    }

    #[test]
    fn search_matches_code() {
        let mut catalog = Catalog::from_entries(vec![
            CatalogEntry::new(10, "Bank").with_code("101401"),
            CatalogEntry::new(11, "Cash").with_code("101501"),
        ]);
        let ids: Vec<_> = catalog.search("1015").iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![None, Some(11)]);
    }

    #[test]
    fn no_match_leaves_only_all() {
        let mut catalog = sample();
        assert_eq!(catalog.search("zzz"), [all_entry()].as_slice());
        assert_eq!(catalog.query(), "zzz");
    }

    #[test]
    fn separator_only_query_matches_literally() {
        let entries = vec![
            CatalogEntry::new(1, "Azure"),
            CatalogEntry::new(2, "Deco"),
            CatalogEntry::new(3, "A-1"),
        ];
        assert_eq!(filter_catalog(&entries[..2], "%%%"), vec![all_entry()]);
        let ids: Vec<_> = filter_catalog(&entries, "-").iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![None, Some(3)]);
        assert_eq!(filter_catalog(&entries, "   ").len(), 4);
    }

    #[test]
    fn query_filters_on_rank() {
        let query = search_query("res.partner", Some("supplier_rank"));
        assert_eq!(query.domain, vec![json!(["supplier_rank", ">", 0])]);
        assert!(search_query("res.partner", None).domain.is_empty());
    }
}
