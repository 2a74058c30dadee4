//! Content hash of a record set, stable across input order.

use crate::domain::TradeRecord;

/// BLAKE3 hash (hex) of the records in canonical (date, partner, flow) order.
///
/// Values are hashed by their bit pattern, so any change to a value changes the hash.
pub fn dataset_hash(records: &[TradeRecord]) -> String {
    let mut sorted: Vec<&TradeRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        (a.date, a.partner, a.flow)
            .cmp(&(b.date, b.partner, b.flow))
            .then(a.value.total_cmp(&b.value))
    });

    let mut hasher = blake3::Hasher::new();
    for r in sorted {
        hasher.update(r.date.to_string().as_bytes());
        hasher.update(r.reporter.slug().as_bytes());
        hasher.update(r.partner.slug().as_bytes());
        hasher.update(r.flow.slug().as_bytes());
        hasher.update(&r.value.to_bits().to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
