use std::collections::HashMap;

use serde::Serialize;

use crate::record::Record;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub label: String,
    pub count: u64,
}

/// Groups records by category label and orders the groups by count,
/// highest first. Equal counts keep the order in which their label was first
/// seen. Records without a label are not counted.
pub fn rank<R: Record>(records: &[R]) -> Vec<RankedEntry> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut ranking: Vec<RankedEntry> = Vec::new();

    for record in records {
        let Some(label) = record.category_label() else {
            continue;
        };
        match positions.get(label) {
            Some(&idx) => ranking[idx].count += 1,
            None => {
                positions.insert(label, ranking.len());
                ranking.push(RankedEntry {
                    label: label.to_owned(),
                    count: 1,
                });
            }
        }
    }

    // sort_by is stable, which preserves first-seen order among ties
    ranking.sort_by(|a, b| b.count.cmp(&a.count));
    ranking
}
