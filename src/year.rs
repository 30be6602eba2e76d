//! Code for working with values indexed by year.
//!
//! Breakpoint series (cost curves, vintage efficiency tables) are stored as ordered `(year, value)`
//! pairs. Values for years between breakpoints are either interpolated linearly or held at the last
//! breakpoint; years outside the breakpoints are clamped to the nearest one.
use serde_string_enum::DeserializeLabeledStringEnum;

/// Check whether a slice is sorted in strictly ascending order
pub fn is_sorted_and_unique<T: PartialOrd>(values: &[T]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

/// How values between two breakpoints are derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, DeserializeLabeledStringEnum)]
pub enum Interpolation {
    /// Linear interpolation between neighbouring breakpoints
    #[default]
    #[string = "linear"]
    Linear,
    /// Hold the value of the last breakpoint until the next one
    #[string = "step"]
    Step,
}

/// Evaluate a breakpoint series at the given year.
///
/// `points` must be sorted by year without duplicates. Years before the first breakpoint take the
/// first value and years after the last take the last value. Returns `None` if `points` is empty.
pub fn interpolate_year(points: &[(u32, f64)], year: u32, method: Interpolation) -> Option<f64> {
    let (first, last) = (points.first()?, points.last()?);
    if year <= first.0 {
        return Some(first.1);
    }
    if year >= last.0 {
        return Some(last.1);
    }

    // Index of the first breakpoint after `year`; guaranteed to be in 1..len by the checks above
    let idx = points.partition_point(|(y, _)| *y <= year);
    let (y0, v0) = points[idx - 1];
    let (y1, v1) = points[idx];
    if y0 == year {
        return Some(v0);
    }

    let value = match method {
        Interpolation::Step => v0,
        Interpolation::Linear => {
            let t = f64::from(year - y0) / f64::from(y1 - y0);
            v0 + t * (v1 - v0)
        }
    };

    Some(value)
}
