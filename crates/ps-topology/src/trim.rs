//! Cutting a computed sweep down to the part between its bounding points.

use ps_core::geometry::project;
use ps_core::{Point2, Real};

use crate::entity::UnivariantLine;

/// Rebuild `used` and `trimmed` of `uni` for the given endpoint coordinates.
///
/// Projections run in scaled coordinates (`y * ratio`) so that arclength is
/// comparable along both axes. When the begin point projects past the end
/// point the line's `begin`/`end` references are swapped as well, so `begin`
/// is always the earlier end along the sweep.
pub(crate) fn trim_line(
    uni: &mut UnivariantLine,
    mut p1: Option<Point2>,
    mut p2: Option<Point2>,
    ratio: Real,
) {
    let n = uni.raw.len();
    if uni.manual {
        uni.used = if p1.is_none() && p2.is_none() { 0..n } else { 0..0 };
    } else if (p1.is_some() || p2.is_some()) && n >= 2 {
        let scaled: Vec<Point2> = uni.raw.iter().map(|p| p.scaled(ratio)).collect();
        let vdst: Vec<Real> = scaled.iter().map(|v| project(&scaled, *v)).collect();
        let mut d1 = project(&scaled, p1.unwrap_or(uni.raw[0]).scaled(ratio));
        let mut d2 = project(&scaled, p2.unwrap_or(uni.raw[n - 1]).scaled(ratio));
        if d1 > d2 {
            std::mem::swap(&mut d1, &mut d2);
            std::mem::swap(&mut p1, &mut p2);
            std::mem::swap(&mut uni.begin, &mut uni.end);
        }
        let start = vdst.iter().position(|&v| v >= d1).unwrap_or(n);
        let stop = vdst.iter().rposition(|&v| v <= d2).map_or(0, |i| i + 1);
        uni.used = start..stop.max(start);
    } else {
        uni.used = 0..n;
    }

    let mut trimmed = Vec::with_capacity(uni.used.len() + 2);
    trimmed.extend(p1);
    trimmed.extend_from_slice(&uni.raw[uni.used.clone()]);
    trimmed.extend(p2);
    uni.trimmed = trimmed;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ps_core::{InvId, PhaseSet};

    fn sweep(n: usize) -> UnivariantLine {
        let pts = (0..n).map(|i| Point2::new(i as Real, 0.5 * i as Real)).collect();
        UnivariantLine::new(PhaseSet::parse("g bi q"), PhaseSet::parse("g"))
            .unwrap()
            .with_samples(pts, Vec::new())
    }

    #[test]
    fn unbound_line_keeps_everything() {
        let mut uni = sweep(7);
        trim_line(&mut uni, None, None, 2.0);
        assert_eq!(uni.used(), 0..7);
        assert_eq!(uni.trimmed().len(), 7);
    }

    #[test]
    fn reversed_ends_are_swapped() {
        let mut uni = sweep(10).between(InvId::new(1), InvId::new(2));
        let near_end = Point2::new(7.5, 3.75);
        let near_start = Point2::new(1.5, 0.75);
        trim_line(&mut uni, Some(near_end), Some(near_start), 1.0);
        assert_eq!(uni.begin, InvId::new(2));
        assert_eq!(uni.end, InvId::new(1));
        assert_eq!(uni.used(), 2..8);
        assert_eq!(uni.trimmed().first(), Some(&near_start));
        assert_eq!(uni.trimmed().last(), Some(&near_end));
        assert_eq!(uni.trimmed().len(), 8);
    }

    #[test]
    fn manual_bound_line_has_no_samples() {
        let mut uni = sweep(4);
        uni.manual = true;
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(1.0, 1.0);
        trim_line(&mut uni, Some(a), Some(b), 1.0);
        assert_eq!(uni.trimmed(), &[a, b]);
        assert_eq!(uni.used(), 0..0);
    }

    #[test]
    fn ends_between_two_samples() {
        let mut uni = sweep(5);
        let a = Point2::new(2.2, 1.1);
        let b = Point2::new(2.6, 1.3);
        trim_line(&mut uni, Some(a), Some(b), 1.0);
        assert!(uni.used().is_empty());
        assert_eq!(uni.trimmed(), &[a, b]);
    }
}
