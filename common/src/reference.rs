//! Reference data: pick-list options and the EAN prefix rule table
//!
//! Starts from the built-in defaults. An external workbook (rows of named
//! cells) can be overlaid list by list: a category is replaced only when
//! the external extraction for it is non-empty. User edits to the option
//! lists (`OptionEdits`) are replayed on top of both.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::defaults;
use crate::resolver::SupplierResolver;
use crate::types::{ProductType, SupplierRule};

/// One spreadsheet row: column header → cell text
pub type SheetRow = HashMap<String, String>;

/// Column holding the EAN prefix of a rule
pub const RULE_ROOT_COLUMN: &str = "RadiceEAN";
/// Column holding the supplier of a rule (also feeds the supplier list)
pub const RULE_SUPPLIER_COLUMN: &str = "NomeFornitore";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceCategory {
    Chains,
    Stores,
    Plants,
    Flowers,
    Suppliers,
    Stems,
    Vases,
}

impl ReferenceCategory {
    pub const ALL: [ReferenceCategory; 7] = [
        ReferenceCategory::Chains,
        ReferenceCategory::Stores,
        ReferenceCategory::Plants,
        ReferenceCategory::Flowers,
        ReferenceCategory::Suppliers,
        ReferenceCategory::Stems,
        ReferenceCategory::Vases,
    ];

    /// Workbook column the category is read from (case-sensitive)
    pub fn column(&self) -> &'static str {
        match self {
            ReferenceCategory::Chains => "Catene",
            ReferenceCategory::Stores => "Negozi",
            ReferenceCategory::Plants => "Piante",
            ReferenceCategory::Flowers => "Fiori",
            ReferenceCategory::Suppliers => RULE_SUPPLIER_COLUMN,
            ReferenceCategory::Stems => "Steli",
            ReferenceCategory::Vases => "Vasi",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            ReferenceCategory::Chains => "chains",
            ReferenceCategory::Stores => "stores",
            ReferenceCategory::Plants => "plants",
            ReferenceCategory::Flowers => "flowers",
            ReferenceCategory::Suppliers => "suppliers",
            ReferenceCategory::Stems => "stems",
            ReferenceCategory::Vases => "vases",
        }
    }
}

impl fmt::Display for ReferenceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ReferenceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        ReferenceCategory::ALL
            .into_iter()
            .find(|c| c.key() == lower || c.column().to_lowercase() == lower)
            .ok_or_else(|| {
                format!(
                    "Categoria sconosciuta: {}. Usa chains, stores, plants, flowers, suppliers, stems o vases",
                    s
                )
            })
    }
}

/// The seven option lists plus the rule table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceDataSet {
    pub chains: Vec<String>,
    pub stores: Vec<String>,
    pub plants: Vec<String>,
    pub flowers: Vec<String>,
    pub suppliers: Vec<String>,
    pub stems: Vec<String>,
    pub vases: Vec<String>,
    pub supplier_rules: Vec<SupplierRule>,
}

impl ReferenceDataSet {
    /// Built-in lists, in their shipped order
    pub fn defaults() -> Self {
        Self {
            chains: defaults::to_owned_list(defaults::STORE_CHAINS),
            stores: defaults::to_owned_list(defaults::STORE_NAMES),
            plants: defaults::to_owned_list(defaults::PLANTS),
            flowers: defaults::to_owned_list(defaults::CUT_FLOWERS),
            suppliers: defaults::to_owned_list(defaults::SUPPLIERS),
            stems: defaults::to_owned_list(defaults::STEM_COUNTS),
            vases: defaults::to_owned_list(defaults::VASE_DIAMETERS),
            supplier_rules: defaults::supplier_rules(),
        }
    }

    /// Extract every category from workbook rows.
    ///
    /// Returns `None` when no category and no rule could be extracted (empty
    /// sheet or none of the expected columns), which callers treat the same
    /// as an absent workbook.
    pub fn from_rows(rows: &[SheetRow]) -> Option<Self> {
        let mut set = Self {
            supplier_rules: extract_rules(rows),
            ..Default::default()
        };
        for category in ReferenceCategory::ALL {
            *set.list_mut(category) = extract_column(rows, category.column());
        }
        (!set.is_empty()).then_some(set)
    }

    /// True when every list and the rule table are empty
    pub fn is_empty(&self) -> bool {
        self.supplier_rules.is_empty()
            && ReferenceCategory::ALL
                .into_iter()
                .all(|category| self.list(category).is_empty())
    }

    pub fn list(&self, category: ReferenceCategory) -> &[String] {
        match category {
            ReferenceCategory::Chains => &self.chains,
            ReferenceCategory::Stores => &self.stores,
            ReferenceCategory::Plants => &self.plants,
            ReferenceCategory::Flowers => &self.flowers,
            ReferenceCategory::Suppliers => &self.suppliers,
            ReferenceCategory::Stems => &self.stems,
            ReferenceCategory::Vases => &self.vases,
        }
    }

    fn list_mut(&mut self, category: ReferenceCategory) -> &mut Vec<String> {
        match category {
            ReferenceCategory::Chains => &mut self.chains,
            ReferenceCategory::Stores => &mut self.stores,
            ReferenceCategory::Plants => &mut self.plants,
            ReferenceCategory::Flowers => &mut self.flowers,
            ReferenceCategory::Suppliers => &mut self.suppliers,
            ReferenceCategory::Stems => &mut self.stems,
            ReferenceCategory::Vases => &mut self.vases,
        }
    }

    /// Item-name suggestions for the product type
    pub fn item_options(&self, product_type: ProductType) -> &[String] {
        match product_type {
            ProductType::Bouquet => &self.flowers,
            ProductType::Plant => &self.plants,
        }
    }
}

/// Gather a column: drop blanks, trim, dedupe (exact match), natural sort.
pub fn extract_column(rows: &[SheetRow], column: &str) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for value in rows.iter().filter_map(|row| row.get(column)) {
        let trimmed = value.trim();
        if !trimmed.is_empty() && !values.iter().any(|v| v == trimmed) {
            values.push(trimmed.to_string());
        }
    }
    values.sort_by(|a, b| natural_cmp(a, b));
    values
}

/// Rows with both a root and a supplier become rules. A repeated root keeps
/// the position of its first occurrence and the supplier of its last.
pub fn extract_rules(rows: &[SheetRow]) -> Vec<SupplierRule> {
    let mut rules: Vec<SupplierRule> = Vec::new();
    let mut index_by_root: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let root = row.get(RULE_ROOT_COLUMN).map(|v| v.trim()).unwrap_or("");
        let supplier = row.get(RULE_SUPPLIER_COLUMN).map(|v| v.trim()).unwrap_or("");
        if root.is_empty() || supplier.is_empty() {
            continue;
        }

        match index_by_root.get(root) {
            Some(&idx) => rules[idx].supplier = supplier.to_string(),
            None => {
                index_by_root.insert(root.to_string(), rules.len());
                rules.push(SupplierRule::new(root, supplier));
            }
        }
    }

    rules
}

/// Numeric-aware ordering: digit runs compare by value, so "9" < "10" < "10.5" < "12".
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = chunks(a);
    let mut right = chunks(b);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (is_digits(x), is_digits(y)) {
                    (true, true) => cmp_digits(x, y),
                    _ => x.to_lowercase().cmp(&y.to_lowercase()),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Split into alternating runs of ASCII digits and everything else
fn chunks(s: &str) -> impl Iterator<Item = &str> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let digit = first.is_ascii_digit();
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digit)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

fn cmp_digits(x: &str, y: &str) -> Ordering {
    let x = x.trim_start_matches('0');
    let y = y.trim_start_matches('0');
    x.len().cmp(&y.len()).then_with(|| x.cmp(y))
}

/// Where the active reference data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceSource {
    /// Built-in defaults only (offline)
    #[default]
    Defaults,
    /// An external workbook has been merged in
    External,
}

/// Owner of the live reference data
#[derive(Debug, Clone, Default)]
pub struct ReferenceDataStore {
    data: ReferenceDataSet,
    source: ReferenceSource,
}

impl ReferenceDataStore {
    pub fn initialize() -> Self {
        Self {
            data: ReferenceDataSet::defaults(),
            source: ReferenceSource::Defaults,
        }
    }

    pub fn data(&self) -> &ReferenceDataSet {
        &self.data
    }

    pub fn source(&self) -> ReferenceSource {
        self.source
    }

    pub fn resolver(&self) -> SupplierResolver<'_> {
        SupplierResolver::new(&self.data.supplier_rules)
    }

    /// Overlay an externally loaded set. Empty categories keep the current
    /// list. Returns the categories that were replaced.
    pub fn merge_external(&mut self, mut external: ReferenceDataSet) -> Vec<ReferenceCategory> {
        let mut replaced = Vec::new();

        for category in ReferenceCategory::ALL {
            let incoming = std::mem::take(external.list_mut(category));
            if !incoming.is_empty() {
                *self.data.list_mut(category) = incoming;
                replaced.push(category);
            }
        }
        let rules_replaced = !external.supplier_rules.is_empty();
        if rules_replaced {
            self.data.supplier_rules = external.supplier_rules;
        }

        if rules_replaced || !replaced.is_empty() {
            self.source = ReferenceSource::External;
        }
        tracing::debug!(
            replaced = replaced.len(),
            rules = self.data.supplier_rules.len(),
            "reference data merged"
        );
        replaced
    }

    /// Add a value to an option list: trimmed, ignored when blank or already
    /// present, list kept in natural order. Returns whether it was added.
    pub fn add_option(&mut self, category: ReferenceCategory, value: &str) -> bool {
        let value = value.trim();
        let list = self.data.list_mut(category);
        if value.is_empty() || list.iter().any(|v| v == value) {
            return false;
        }
        list.push(value.to_string());
        list.sort_by(|a, b| natural_cmp(a, b));
        true
    }

    /// Remove a value (exact match after trimming). Returns whether it was
    /// present.
    pub fn remove_option(&mut self, category: ReferenceCategory, value: &str) -> bool {
        let value = value.trim();
        let list = self.data.list_mut(category);
        let before = list.len();
        list.retain(|v| v != value);
        list.len() != before
    }

    /// Replay user edits: removals first, then additions.
    pub fn apply_edits(&mut self, edits: &OptionEdits) {
        for (&category, values) in &edits.removed {
            for value in values {
                self.remove_option(category, value);
            }
        }
        for (&category, values) in &edits.added {
            for value in values {
                self.add_option(category, value);
            }
        }
    }
}

/// Option-list changes made by the user, kept apart from the workbook so
/// they survive every reload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionEdits {
    pub added: BTreeMap<ReferenceCategory, Vec<String>>,
    pub removed: BTreeMap<ReferenceCategory, Vec<String>>,
}

impl OptionEdits {
    pub fn record_add(&mut self, category: ReferenceCategory, value: &str) {
        let value = value.trim();
        Self::forget(&mut self.removed, category, value);
        let added = self.added.entry(category).or_default();
        if !added.iter().any(|v| v == value) {
            added.push(value.to_string());
        }
    }

    pub fn record_remove(&mut self, category: ReferenceCategory, value: &str) {
        let value = value.trim();
        Self::forget(&mut self.added, category, value);
        let removed = self.removed.entry(category).or_default();
        if !removed.iter().any(|v| v == value) {
            removed.push(value.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.values().all(Vec::is_empty) && self.removed.values().all(Vec::is_empty)
    }

    fn forget(map: &mut BTreeMap<ReferenceCategory, Vec<String>>, category: ReferenceCategory, value: &str) {
        if let Some(values) = map.get_mut(&category) {
            values.retain(|v| v != value);
            if values.is_empty() {
                map.remove(&category);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> SheetRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_natural_cmp_numbers() {
        let mut values = vec!["12", "9", "10.5", "10", "6"];
        values.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(values, vec!["6", "9", "10", "10.5", "12"]);
    }

    #[test]
    fn test_natural_cmp_mixed_text() {
        let mut values = vec!["Vaso 14", "Vaso 9", "anthurium", "Azalea"];
        values.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(values, vec!["anthurium", "Azalea", "Vaso 9", "Vaso 14"]);
    }

    #[test]
    fn test_extract_column_trims_dedupes_sorts() {
        let rows = vec![
            row(&[("Vasi", " 14 ")]),
            row(&[("Vasi", "9")]),
            row(&[("Vasi", "")]),
            row(&[("Catene", "Conad")]),
            row(&[("Vasi", "14")]),
        ];
        assert_eq!(extract_column(&rows, "Vasi"), vec!["9", "14"]);
        assert_eq!(extract_column(&rows, "Catene"), vec!["Conad"]);
        assert!(extract_column(&rows, "Fiori").is_empty());
    }

    #[test]
    fn test_extract_column_is_case_sensitive() {
        let rows = vec![row(&[("Piante", "Rosa")]), row(&[("Piante", "rosa")])];
        assert_eq!(extract_column(&rows, "Piante").len(), 2);
    }

    #[test]
    fn test_extract_rules_last_wins() {
        let rows = vec![
            row(&[(RULE_ROOT_COLUMN, "123"), (RULE_SUPPLIER_COLUMN, "X")]),
            row(&[(RULE_ROOT_COLUMN, "456"), (RULE_SUPPLIER_COLUMN, "Z")]),
            row(&[(RULE_ROOT_COLUMN, "123"), (RULE_SUPPLIER_COLUMN, "Y")]),
        ];
        let rules = extract_rules(&rows);
        assert_eq!(
            rules,
            vec![SupplierRule::new("123", "Y"), SupplierRule::new("456", "Z")]
        );
    }

    #[test]
    fn test_extract_rules_requires_both_fields() {
        let rows = vec![
            row(&[(RULE_ROOT_COLUMN, "123")]),
            row(&[(RULE_SUPPLIER_COLUMN, "Solo")]),
            row(&[(RULE_ROOT_COLUMN, " "), (RULE_SUPPLIER_COLUMN, "Vuoto")]),
        ];
        assert!(extract_rules(&rows).is_empty());
    }

    #[test]
    fn test_from_rows_empty_sheet() {
        assert!(ReferenceDataSet::from_rows(&[]).is_none());
    }

    #[test]
    fn test_from_rows_without_known_columns() {
        let rows = vec![row(&[("Chains", "Conad")]), row(&[("Colori", "Rosso")])];
        assert!(ReferenceDataSet::from_rows(&rows).is_none());
    }

    #[test]
    fn test_merge_of_empty_set_keeps_default_source() {
        let mut store = ReferenceDataStore::initialize();
        let replaced = store.merge_external(ReferenceDataSet::default());
        assert!(replaced.is_empty());
        assert_eq!(store.source(), ReferenceSource::Defaults);
        assert_eq!(store.data(), &ReferenceDataSet::defaults());
    }

    #[test]
    fn test_add_option_trims_dedupes_sorts() {
        let mut store = ReferenceDataStore::initialize();
        store.data.vases = vec!["9".into(), "14".into()];

        assert!(store.add_option(ReferenceCategory::Vases, " 12 "));
        assert!(!store.add_option(ReferenceCategory::Vases, "12"));
        assert!(!store.add_option(ReferenceCategory::Vases, "   "));
        assert_eq!(store.data().vases, vec!["9", "12", "14"]);
    }

    #[test]
    fn test_remove_option() {
        let mut store = ReferenceDataStore::initialize();
        store.data.chains = vec!["Conad".into(), "Coop".into()];

        assert!(store.remove_option(ReferenceCategory::Chains, " Coop"));
        assert!(!store.remove_option(ReferenceCategory::Chains, "coop"));
        assert_eq!(store.data().chains, vec!["Conad"]);
    }

    #[test]
    fn test_option_edits_replay_after_reload() {
        let mut edits = OptionEdits::default();
        edits.record_add(ReferenceCategory::Suppliers, "Vivaio Rossi");
        edits.record_remove(ReferenceCategory::Chains, "Conad");
        edits.record_add(ReferenceCategory::Plants, "Kentia");
        edits.record_remove(ReferenceCategory::Plants, "Kentia");

        let mut store = ReferenceDataStore::initialize();
        store.data.chains = vec!["Conad".into(), "Coop".into()];
        store.apply_edits(&edits);

        assert!(store.data().suppliers.contains(&"Vivaio Rossi".to_string()));
        assert_eq!(store.data().chains, vec!["Coop"]);
        assert!(!store.data().plants.contains(&"Kentia".to_string()));
        assert_eq!(edits.added.get(&ReferenceCategory::Plants), None);
    }

    #[test]
    fn test_option_edits_json_keys() {
        let mut edits = OptionEdits::default();
        edits.record_add(ReferenceCategory::Stems, "25");
        let json = serde_json::to_string(&edits).unwrap();
        assert_eq!(json, r#"{"added":{"stems":["25"]},"removed":{}}"#);
        assert_eq!(serde_json::from_str::<OptionEdits>(&json).unwrap(), edits);
        assert!(serde_json::from_str::<OptionEdits>("{}").unwrap().is_empty());
    }

    #[test]
    fn test_merge_keeps_defaults_for_empty_lists() {
        let mut store = ReferenceDataStore::initialize();
        let default_plants = store.data().plants.clone();

        let external = ReferenceDataSet::from_rows(&[
            row(&[(RULE_SUPPLIER_COLUMN, "Nuovo Vivaio")]),
            row(&[(RULE_SUPPLIER_COLUMN, "Altro Vivaio")]),
        ])
        .expect("rows present");
        let replaced = store.merge_external(external);

        assert_eq!(store.data().plants, default_plants);
        assert_eq!(store.data().suppliers, vec!["Altro Vivaio", "Nuovo Vivaio"]);
        assert_eq!(replaced, vec![ReferenceCategory::Suppliers]);
        // no rule rows in the sheet: default table stays
        assert_eq!(store.data().supplier_rules.len(), defaults::SUPPLIER_EAN_RULES.len());
        assert_eq!(store.source(), ReferenceSource::External);
    }

    #[test]
    fn test_merge_replaces_rule_table() {
        let mut store = ReferenceDataStore::initialize();
        let external = ReferenceDataSet::from_rows(&[row(&[
            (RULE_ROOT_COLUMN, "8099999"),
            (RULE_SUPPLIER_COLUMN, "Vivaio Test"),
        ])])
        .expect("rows present");
        store.merge_external(external);

        assert_eq!(store.data().supplier_rules, vec![SupplierRule::new("8099999", "Vivaio Test")]);
        assert!(store.resolver().resolve("8010896123456").is_none());
    }

    #[test]
    fn test_item_options_by_type() {
        let data = ReferenceDataSet::defaults();
        assert!(data.item_options(ProductType::Bouquet).contains(&"Tulipani".to_string()));
        assert!(data.item_options(ProductType::Plant).contains(&"Orchidea".to_string()));
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("plants".parse::<ReferenceCategory>().unwrap(), ReferenceCategory::Plants);
        assert_eq!("Vasi".parse::<ReferenceCategory>().unwrap(), ReferenceCategory::Vases);
        assert!("colori".parse::<ReferenceCategory>().is_err());
    }

    #[test]
    fn test_initialize_uses_defaults() {
        let store = ReferenceDataStore::initialize();
        assert_eq!(store.source(), ReferenceSource::Defaults);
        assert_eq!(store.data().chains.len(), defaults::STORE_CHAINS.len());
    }
}
