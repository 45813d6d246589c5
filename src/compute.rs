use crate::data::Record;
use crate::mapping::{CategoryMap, PLACEHOLDER};
use crate::read::RecordSink;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// A payee must show up this often before it is worth a mapping entry.
pub(crate) const MIN_OCCURRENCES: u32 = 2;

/// Source of categories for payees that are not in the mapping yet. The
/// interactive stdin prompter implements this; tests use canned answers.
/// Returning `None` means "no answer", which falls back to the placeholder.
pub(crate) trait CategoryPrompter {
    fn prompt(&mut self, payee: &str) -> Result<Option<String>, anyhow::Error>;
}

/// Payee frequency table for one analyse run. Counting is case-sensitive,
/// exact match on the already-trimmed payee. First-seen order is kept
/// because it decides the order of the rewritten mapping file.
#[derive(Debug, Default)]
pub(crate) struct PayeeCounts {
    counts: HashMap<String, u32>,
    order: Vec<String>,
}

impl PayeeCounts {
    #[cfg(test)]
    pub fn count(&self, payee: &str) -> u32 {
        self.counts.get(payee).copied().unwrap_or(0)
    }
}

impl RecordSink for PayeeCounts {
    fn use_record(&mut self, record: Record) -> Result<(), anyhow::Error> {
        match self.counts.entry(record.payee) {
            Entry::Occupied(mut entry) => *entry.get_mut() += 1,
            Entry::Vacant(entry) => {
                self.order.push(entry.key().clone());
                entry.insert(1);
            }
        }
        Ok(())
    }
}

/// Build the mapping to be written back to disk: every payee seen at least
/// `MIN_OCCURRENCES` times gets an entry, reusing its existing category when
/// there is one. One-off payees are dropped, and existing entries for them
/// are not carried over either, since the file is rewritten in full.
pub(crate) fn build_mapping(
    counts: &PayeeCounts,
    existing: &CategoryMap,
    mut prompter: Option<&mut dyn CategoryPrompter>,
) -> Result<CategoryMap, anyhow::Error> {
    let mut mapping = CategoryMap::default();
    for payee in &counts.order {
        if counts.counts[payee] < MIN_OCCURRENCES {
            continue;
        }
        let category = match existing.get(payee) {
            Some(category) => category.to_string(),
            None => {
                let answer = match prompter.as_deref_mut() {
                    Some(prompter) => prompter.prompt(payee)?,
                    None => None,
                };
                answer.unwrap_or_else(|| PLACEHOLDER.to_string())
            }
        };
        mapping.insert(payee.clone(), category);
    }
    Ok(mapping)
}
