#![forbid(unsafe_code)]

//! Easing primitives used by the highlight projection.
//!
//! All functions are pure and allocation-free so they can run inside render
//! callbacks on any thread.

/// Alpha applied to words far ahead of the cursor.
pub const HIGHLIGHT_FLOOR_ALPHA: f64 = 0.3;

/// Number of word positions over which a word fades from floor to full alpha.
pub const HIGHLIGHT_WINDOW_WORDS: f64 = 2.0;

/// Clamp `t` into [0, 1]. NaN maps to 0.
#[inline]
pub fn clamp01(t: f64) -> f64 {
    if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) }
}

/// Hermite smoothstep between two edges.
///
/// `t = clamp((x - edge0) / (edge1 - edge0), 0, 1)`, returned as `t * t * (3 - 2t)`.
/// Infinite `x` saturates to the nearest edge. Degenerate edges act as a step at `edge0`.
#[inline]
pub fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    let span = edge1 - edge0;
    if span == 0.0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = clamp01((x - edge0) / span);
    t * t * (3.0 - 2.0 * t)
}

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Alpha for a word `distance` positions behind the cursor.
///
/// `distance = progress - word_index`. Words at or behind the cursor
/// (`distance >= 0`) are fully opaque; words two or more positions ahead
/// sit at [`HIGHLIGHT_FLOOR_ALPHA`].
#[inline]
pub fn highlight_alpha(distance: f64) -> f64 {
    let ramp = smoothstep(-HIGHLIGHT_WINDOW_WORDS, 0.0, distance);
    lerp(HIGHLIGHT_FLOOR_ALPHA, 1.0, ramp)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn smoothstep_edges() {
        assert_eq!(smoothstep(-2.0, 0.0, -2.0), 0.0);
        assert_eq!(smoothstep(-2.0, 0.0, 0.0), 1.0);
        assert!((smoothstep(-2.0, 0.0, -1.0) - 0.5).abs() < EPS);
    }

    #[test]
    fn smoothstep_saturates_outside_range() {
        assert_eq!(smoothstep(-2.0, 0.0, -10.0), 0.0);
        assert_eq!(smoothstep(-2.0, 0.0, 10.0), 1.0);
        assert_eq!(smoothstep(-2.0, 0.0, f64::NEG_INFINITY), 0.0);
        assert_eq!(smoothstep(-2.0, 0.0, f64::INFINITY), 1.0);
    }

    #[test]
    fn smoothstep_degenerate_edges_is_step() {
        assert_eq!(smoothstep(1.0, 1.0, 0.5), 0.0);
        assert_eq!(smoothstep(1.0, 1.0, 1.0), 1.0);
    }

    #[test]
    fn alpha_full_at_or_behind_cursor() {
        assert!((highlight_alpha(0.0) - 1.0).abs() < EPS);
        assert!((highlight_alpha(3.5) - 1.0).abs() < EPS);
    }

    #[test]
    fn alpha_floor_far_ahead() {
        assert!((highlight_alpha(-2.0) - HIGHLIGHT_FLOOR_ALPHA).abs() < EPS);
        assert!((highlight_alpha(-40.0) - HIGHLIGHT_FLOOR_ALPHA).abs() < EPS);
        assert!((highlight_alpha(f64::NEG_INFINITY) - HIGHLIGHT_FLOOR_ALPHA).abs() < EPS);
    }

    #[test]
    fn alpha_midpoint() {
        // smoothstep(-2, 0, -1) = 0.5
        assert!((highlight_alpha(-1.0) - 0.65).abs() < EPS);
    }

    #[test]
    fn alpha_is_monotonic_in_distance() {
        let mut prev = highlight_alpha(-3.0);
        let mut d = -3.0;
        while d <= 1.0 {
            let a = highlight_alpha(d);
            assert!(a + EPS >= prev, "alpha decreased at {d}");
            prev = a;
            d += 0.05;
        }
    }
}
