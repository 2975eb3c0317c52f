//! Predicate filtering and record finalization.

use serde_json::Value;

use super::record::{FinalRecord, PartialRecord};
use super::resolve::Resolver;
use crate::error::MatrixResult;
use crate::expr;
use crate::trace::TraceSink;

/// Evaluate each record's accumulated conditions, drop records that fail
/// one (short-circuiting the rest) or end up with no fields, and snapshot
/// survivors to concrete values.
///
/// Conditions evaluate against the record itself, so they may reference
/// sibling fields — including not-yet-resolved dynamic fields — and the
/// external config. The snapshot freezes dynamic results at their
/// first-read value.
pub fn filter_records(
    records: Vec<PartialRecord>,
    config: &Value,
    trace: &dyn TraceSink,
) -> MatrixResult<Vec<FinalRecord>> {
    let mut output = Vec::new();

    'records: for record in records {
        let mut resolver = Resolver::new(&record, config);

        for condition in &record.conditions {
            let value = expr::evaluate(condition, &mut resolver)?;
            if !expr::truthy(&value) {
                trace.detailed(&format!(
                    "dropping record: predicate '{}' failed",
                    condition
                ));
                continue 'records;
            }
        }

        let snapshot = resolver.snapshot()?;
        if snapshot.is_empty() {
            trace.detailed("dropping structurally empty record");
            continue;
        }
        output.push(snapshot);
    }

    Ok(output)
}
