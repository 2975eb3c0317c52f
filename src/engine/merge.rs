//! Cartesian merge of independent factor lists.

use super::record::PartialRecord;

/// Combine factor lists into their full cartesian product, merging each
/// tuple left-to-right into one record.
///
/// Empty factor lists are eliminated first: an empty factor contributes
/// no constraint and must not collapse the whole product. With no
/// non-empty factors the product is a single empty record, which later
/// stages treat as "no data".
///
/// Output order is the product's lexicographic iteration order over the
/// factor lists in the order supplied, which is what makes the engine
/// deterministic end to end.
pub fn cartesian_merge(factors: Vec<Vec<PartialRecord>>) -> Vec<PartialRecord> {
    let factors: Vec<Vec<PartialRecord>> =
        factors.into_iter().filter(|f| !f.is_empty()).collect();

    let mut output = vec![PartialRecord::default()];
    for factor in &factors {
        let mut next = Vec::with_capacity(output.len() * factor.len());
        for base in &output {
            for record in factor {
                let mut merged = base.clone();
                merged.absorb(record);
                next.push(merged);
            }
        }
        output = next;
    }
    output
}
