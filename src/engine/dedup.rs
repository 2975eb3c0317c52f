//! Specificity-based deduplication and override pass.

use super::record::{stringify, FinalRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Masking {
    /// Records are unrelated; both stay.
    Unrelated,
    /// Identical key set and values; the earlier record wins.
    Equal,
    /// The incoming record is strictly more specific and supersedes the
    /// earlier one.
    Superset,
}

fn masks(item: &FinalRecord, previous: &FinalRecord) -> Masking {
    if previous.len() > item.len() {
        return Masking::Unrelated;
    }
    for (key, prev_value) in previous {
        match item.get(key) {
            Some(value) if stringify(value) == stringify(prev_value) => {}
            _ => return Masking::Unrelated,
        }
    }
    if item.len() == previous.len() {
        Masking::Equal
    } else {
        Masking::Superset
    }
}

/// Remove exact duplicates and records subsumed by a later, more specific
/// record, preserving first-seen order.
///
/// Quadratic in the output size; acceptable for the matrix sizes this
/// drives. If that ever changes, an index over key sets is the way out.
pub fn dedup(records: Vec<FinalRecord>) -> Vec<FinalRecord> {
    let mut accepted: Vec<FinalRecord> = Vec::new();

    'incoming: for item in records {
        let mut i = 0;
        while i < accepted.len() {
            match masks(&item, &accepted[i]) {
                Masking::Equal => continue 'incoming,
                // One incoming record may supersede several accepted ones.
                Masking::Superset => {
                    accepted.remove(i);
                }
                Masking::Unrelated => i += 1,
            }
        }
        accepted.push(item);
    }

    accepted
}
