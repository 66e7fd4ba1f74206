//! WordprocessingML unit conversions
//!
//! Lengths are written as twips (1/20 pt), font sizes as half-points.
//! All conversions round to the nearest integer (ties to even); fractional
//! twips are never written into the document.

/// Millimetres to twips: `mm × 56.7`, rounded to the nearest integer.
///
/// Computed as `mm × 567 / 10` so that exact halves (15 mm → 850.5) stay
/// exact in binary and round to even (850) instead of drifting up to 851.
pub fn mm_to_twips(mm: f64) -> i64 {
    (mm * 567.0 / 10.0).round_ties_even() as i64
}

/// Points to half-points: `round(pt × 2)`.
pub fn pt_to_half_points(pt: f64) -> i64 {
    (pt * 2.0).round_ties_even() as i64
}

/// Points to twips: `round(pt × 20)`. Used for `w:before`/`w:after`
/// paragraph spacing.
pub fn pt_to_twips(pt: f64) -> i64 {
    (pt * 20.0).round_ties_even() as i64
}

/// Line-spacing multiplier to twips: `round(multiplier × 240)`.
///
/// 240 twips is one single-spaced line when `w:lineRule="auto"`.
pub fn line_spacing_to_twips(multiplier: f64) -> i64 {
    (multiplier * 240.0).round_ties_even() as i64
}
