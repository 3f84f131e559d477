//! Grouping of publishers under publishing houses and of usage records
//! under publishers.

use std::collections::{HashMap, HashSet};

use badger_core::models::{Publisher, UsageRecord, UNCATEGORIZED};

// ── House grouping ────────────────────────────────────────────────────────────

/// Group publishers by publishing house.
///
/// Houses appear in first-seen order of the input, with publishers preserved
/// in input order inside each group. A publisher with no house assignment
/// lands in the "Uncategorized" group. Publisher names are deduplicated
/// globally: the first row naming a publisher wins and later rows with the
/// same name are dropped, so no publisher appears under two houses.
pub fn group_by_house(publishers: &[Publisher]) -> Vec<(String, Vec<Publisher>)> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Publisher>> = HashMap::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for publisher in publishers {
        if !seen.insert(publisher.name.as_str()) {
            continue;
        }
        let house = publisher
            .house
            .as_deref()
            .unwrap_or(UNCATEGORIZED)
            .to_string();
        if !groups.contains_key(&house) {
            order.push(house.clone());
        }
        groups.entry(house).or_default().push(publisher.clone());
    }

    order
        .into_iter()
        .map(|house| {
            let members = groups.remove(&house).unwrap_or_default();
            (house, members)
        })
        .collect()
}

/// Index usage records by publisher name.
pub fn records_by_publisher(records: &[UsageRecord]) -> HashMap<String, Vec<UsageRecord>> {
    let mut index: HashMap<String, Vec<UsageRecord>> = HashMap::new();
    for record in records {
        index
            .entry(record.publisher.clone())
            .or_default()
            .push(record.clone());
    }
    index
}

// ── Tests ─────────────────────────────────────────────────────────────────────
