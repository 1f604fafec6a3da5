// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema-version normalization and field-type coercion.
//!
//! The two backend wire generations are mutually incompatible:
//! the legacy shape is columnar (`name`/`columns`/`points`), the current
//! shape is a measurement with a field mapping. Conversion here is pure;
//! the adapter decides when to apply it.

use crate::chunk::{Chunk, FieldSet, FieldValue, LegacyChunk};
use crate::error::ForwardError;

/// Convert a legacy columnar record into the current shape.
///
/// `fields[columns[i]] = points[0][i]`. Exactly one point row is supported.
/// Tags and an explicit timestamp are not populated: the legacy row shape
/// never carried them, so converted writes go out with server-assigned
/// ingestion time.
pub fn legacy_to_current(legacy: &LegacyChunk) -> Result<Chunk, ForwardError> {
    let row = match legacy.points.as_slice() {
        [row] => row,
        rows => {
            return Err(ForwardError::Decode(format!(
                "legacy record for {:?} must carry exactly one point row, got {}",
                legacy.name,
                rows.len()
            )))
        }
    };

    if row.len() != legacy.columns.len() {
        return Err(ForwardError::Decode(format!(
            "legacy record for {:?} has {} columns but {} values",
            legacy.name,
            legacy.columns.len(),
            row.len()
        )));
    }

    let fields: FieldSet = legacy
        .columns
        .iter()
        .cloned()
        .zip(row.iter().cloned())
        .collect();

    Ok(Chunk::new(legacy.name.clone(), fields))
}

/// Coerce numeric-looking text fields to floats, in place.
///
/// The backend rejects a write when a field's type differs from the type
/// established by the series' first write. Telemetry producers commonly
/// deliver readings as strings, so any text value that parses as a float is
/// replaced by the parsed number. Non-numeric text and already-typed values
/// are left untouched. Idempotent.
pub fn coerce_field_types(fields: &mut FieldSet) {
    for (_, value) in fields.iter_mut() {
        if let FieldValue::Text(text) = value {
            if let Ok(number) = text.trim().parse::<f64>() {
                *value = FieldValue::Float(number);
            }
        }
    }
}
