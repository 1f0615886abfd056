//! Collection checksums.
//!
//! FNV-1a over the canonical JSON form of an entry list. Fast, deterministic
//! and order-sensitive; it detects accidental corruption and makes no attempt
//! at collision resistance.

use serde::Serialize;
use serde_json::Value;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hash a string, rendered as 16 lowercase hex digits.
pub fn checksum(data: &str) -> String {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in data.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    format!("{:016x}", hash)
}

/// Checksum of an already-parsed entry list.
///
/// `serde_json::Value` objects serialize with sorted keys, so the result does
/// not depend on the field order the list was originally written with.
pub fn checksum_values(values: &[Value]) -> Result<String, serde_json::Error> {
    Ok(checksum(&serde_json::to_string(values)?))
}

/// Checksum of a typed entry list, identical to `checksum_values` on its JSON form.
pub fn checksum_entries<T: Serialize>(entries: &[T]) -> Result<String, serde_json::Error> {
    let values = entries
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    checksum_values(&values)
}
