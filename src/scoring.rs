//! Form scoring (C7): start at 100, deduct per error severity, clamp to
//! [0, 100] (`spec.md` §4.7).

use crate::analyzers::{FormError, Severity};

/// Deducts 20 per `high`, 10 per `medium`, 5 per `low`; `warning` and
/// `error` severities do not affect the score (they exist for wire-level
/// classification only, mirroring the teacher's separation of log level
/// from user-facing scoring).
pub fn score(errors: &[FormError]) -> u8 {
    let deduction: i32 = errors
        .iter()
        .map(|e| match e.severity {
            Severity::High => 20,
            Severity::Medium => 10,
            Severity::Low => 5,
            Severity::Warning | Severity::Error => 0,
        })
        .sum();
    (100 - deduction).clamp(0, 100) as u8
}
