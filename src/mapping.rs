use anyhow::{bail, Context};
use std::fs;
use std::path::Path;

/// Category value written for payees nobody has categorized yet; meant to be
/// replaced by hand in the mapping file.
pub(crate) const PLACEHOLDER: &str = "<ENTER CATEGORY>";

/// Persisted payee → category lookup, kept in first-seen order because the
/// mapping file is rewritten entry-by-entry in that order on every analyse
/// run. The file itself is TOML, one `payee = "category"` line per entry, so
/// it stays trivially hand-editable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CategoryMap {
    entries: Vec<(String, String)>,
}

impl CategoryMap {
    pub fn get(&self, payee: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == payee)
            .map(|(_, category)| category.as_str())
    }

    /// Insert or replace, keeping the position of an existing key.
    pub fn insert(&mut self, payee: String, category: String) {
        match self.entries.iter_mut().find(|(key, _)| *key == payee) {
            Some(entry) => entry.1 = category,
            None => self.entries.push((payee, category)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn from_toml_str(text: &str) -> Result<Self, anyhow::Error> {
        let table: toml::Table = text.parse().context("mapping file is not valid TOML")?;
        let mut map = Self::default();
        for (payee, value) in table {
            match value {
                toml::Value::String(category) => map.entries.push((payee, category)),
                other => bail!("category for {payee:?} must be a string, got {other}"),
            }
        }
        Ok(map)
    }

    pub fn to_toml_string(&self) -> String {
        let mut table = toml::Table::new();
        for (payee, category) in &self.entries {
            table.insert(payee.clone(), toml::Value::String(category.clone()));
        }
        toml::to_string(&table).expect("string-only table always serializes")
    }

    /// Load the mapping file; a missing file is an empty mapping, so a first
    /// analyse run needs no setup.
    pub fn load(path: &Path) -> Result<Self, anyhow::Error> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read mapping file {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    /// Rewrite the mapping file in full; analyse never appends.
    pub fn store(&self, path: &Path) -> Result<(), anyhow::Error> {
        fs::write(path, self.to_toml_string())
            .with_context(|| format!("cannot write mapping file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_file_order() {
        let map = CategoryMap::from_toml_str(
            "\"REWE Markt\" = \"Groceries\"\nStadtwerke = \"Utilities\"\n",
        )
        .unwrap();
        assert_eq!(map.get("REWE Markt"), Some("Groceries"));
        assert_eq!(map.get("Stadtwerke"), Some("Utilities"));
        assert_eq!(map.get("Unknown"), None);
        assert_eq!(
            map.to_toml_string(),
            "\"REWE Markt\" = \"Groceries\"\nStadtwerke = \"Utilities\"\n"
        );
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut map = CategoryMap::default();
        map.insert("A".to_string(), PLACEHOLDER.to_string());
        map.insert("B".to_string(), "Rent".to_string());
        map.insert("A".to_string(), "Groceries".to_string());
        assert_eq!(map.len(), 2);
        assert_eq!(map.to_toml_string(), "A = \"Groceries\"\nB = \"Rent\"\n");
    }

    #[test]
    fn non_string_category_is_rejected() {
        assert!(CategoryMap::from_toml_str("A = 3\n").is_err());
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let map = CategoryMap::load(&dir.path().join("categories.toml")).unwrap();
        assert_eq!(map, CategoryMap::default());
    }

    #[test]
    fn store_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.toml");
        let mut map = CategoryMap::default();
        map.insert("REWE Markt".to_string(), "Groceries".to_string());
        map.insert("Stadtwerke".to_string(), PLACEHOLDER.to_string());
        map.store(&path).unwrap();
        assert_eq!(CategoryMap::load(&path).unwrap(), map);
    }
}
