//! EAN prefix → supplier resolution

use crate::types::SupplierRule;

/// Borrowed view over the active rule table.
///
/// Matching is first-match in table order, not longest-prefix: rule sets
/// in the field rely on their ordering.
#[derive(Debug, Clone, Copy)]
pub struct SupplierResolver<'a> {
    rules: &'a [SupplierRule],
}

impl<'a> SupplierResolver<'a> {
    pub fn new(rules: &'a [SupplierRule]) -> Self {
        Self { rules }
    }

    /// First rule whose root prefixes `ean`. Empty input never matches.
    pub fn resolve(&self, ean: &str) -> Option<&'a SupplierRule> {
        if ean.is_empty() {
            return None;
        }
        self.rules.iter().find(|rule| ean.starts_with(rule.root.as_str()))
    }

    /// Rule lookup by supplier name (case-insensitive) or root substring,
    /// in table order.
    pub fn search(&self, term: &str) -> impl Iterator<Item = &'a SupplierRule> + '_ {
        let needle = term.trim().to_lowercase();
        self.rules.iter().filter(move |rule| {
            needle.is_empty()
                || rule.supplier.to_lowercase().contains(&needle)
                || rule.root.contains(&needle)
        })
    }

    pub fn rules(&self) -> &'a [SupplierRule] {
        self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults;

    fn overlapping() -> Vec<SupplierRule> {
        vec![
            SupplierRule::new("80", "A"),
            SupplierRule::new("8010896", "B"),
        ]
    }

    #[test]
    fn test_first_match_not_longest() {
        let rules = overlapping();
        let resolver = SupplierResolver::new(&rules);
        let rule = resolver.resolve("8010896123").expect("should match");
        assert_eq!(rule.supplier, "A");
    }

    #[test]
    fn test_order_decides_overlap() {
        let mut rules = overlapping();
        rules.reverse();
        let resolver = SupplierResolver::new(&rules);
        assert_eq!(resolver.resolve("8010896123").unwrap().supplier, "B");
        assert_eq!(resolver.resolve("8099").unwrap().supplier, "A");
    }

    #[test]
    fn test_empty_ean_is_no_match() {
        // a rule with an empty root would prefix everything
        let rules = vec![SupplierRule::new("", "Ovunque")];
        let resolver = SupplierResolver::new(&rules);
        assert!(resolver.resolve("").is_none());
        assert!(resolver.resolve("123").is_some());
    }

    #[test]
    fn test_no_match() {
        let rules = defaults::supplier_rules();
        let resolver = SupplierResolver::new(&rules);
        assert!(resolver.resolve("4006381333931").is_none());
    }

    #[test]
    fn test_default_table() {
        let rules = defaults::supplier_rules();
        let resolver = SupplierResolver::new(&rules);
        assert_eq!(resolver.resolve("8010896000127").unwrap().supplier, "Baldi");
        assert_eq!(resolver.resolve("8032610510019").unwrap().supplier, "Floragro");
    }

    #[test]
    fn test_prefix_is_case_sensitive_exact() {
        let rules = vec![SupplierRule::new("AB", "Lettere")];
        let resolver = SupplierResolver::new(&rules);
        assert!(resolver.resolve("ab123").is_none());
        assert!(resolver.resolve("AB123").is_some());
    }

    #[test]
    fn test_search_by_supplier_or_root() {
        let rules = defaults::supplier_rules();
        let resolver = SupplierResolver::new(&rules);

        let pagano: Vec<_> = resolver.search("pagano").map(|r| r.root.as_str()).collect();
        assert_eq!(pagano, vec!["805534828", "805809362"]);

        let by_root: Vec<_> = resolver.search("8719").map(|r| r.supplier.as_str()).collect();
        assert_eq!(by_root, vec!["Procoflora"]);

        assert_eq!(resolver.search("").count(), rules.len());
    }
}
