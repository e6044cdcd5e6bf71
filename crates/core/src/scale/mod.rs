//! Linear scales with "nice" domain extension and tick generation.

use serde::{Deserialize, Serialize};

const DEFAULT_TICKS: usize = 10;

/// Monotonic mapping from a numeric domain to a numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    /// Builds a scale spanning the extent of `values`. Returns `None` when
    /// there are no finite values.
    pub fn from_values<I>(values: I, range: (f64, f64)) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        extent(values).map(|domain| Self::new(domain, range))
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Maps a domain value into the range. A zero-width domain maps every
    /// value to the middle of the range.
    pub fn scale(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let span = d1 - d0;
        let t = if span == 0.0 { 0.5 } else { (value - d0) / span };
        r0 + t * (r1 - r0)
    }

    pub fn invert(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let span = r1 - r0;
        let t = if span == 0.0 { 0.5 } else { (value - r0) / span };
        d0 + t * (d1 - d0)
    }

    /// Extends the domain outward to round bounds.
    pub fn nice(self) -> Self {
        self.nice_with(DEFAULT_TICKS)
    }

    pub fn nice_with(mut self, count: usize) -> Self {
        let (mut start, mut stop) = self.domain;
        let reversed = stop < start;
        if reversed {
            std::mem::swap(&mut start, &mut stop);
        }
        let mut previous = None;
        for _ in 0..10 {
            let Some(step) = tick_increment(start, stop, count) else {
                break;
            };
            if previous == Some(step) {
                break;
            }
            if step > 0.0 {
                start = (start / step).floor() * step;
                stop = (stop / step).ceil() * step;
            } else {
                start = (start * step).ceil() / step;
                stop = (stop * step).floor() / step;
            }
            previous = Some(step);
        }
        self.domain = if reversed { (stop, start) } else { (start, stop) };
        self
    }

    /// Round tick values inside the domain.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (mut start, mut stop) = self.domain;
        if stop < start {
            std::mem::swap(&mut start, &mut stop);
        }
        if start == stop {
            return vec![start];
        }
        let Some(step) = tick_increment(start, stop, count) else {
            return Vec::new();
        };
        if step > 0.0 {
            let first = (start / step).ceil() as i64;
            let last = (stop / step).floor() as i64;
            (first..=last).map(|i| i as f64 * step).collect()
        } else {
            let inverse = -step;
            let first = (start * inverse).ceil() as i64;
            let last = (stop * inverse).floor() as i64;
            (first..=last).map(|i| i as f64 / inverse).collect()
        }
    }

    /// Decimal places that display ticks of this scale without noise.
    pub fn tick_precision(&self, count: usize) -> usize {
        let (start, stop) = self.domain;
        match tick_increment(start.min(stop), start.max(stop), count) {
            Some(step) if step < 0.0 => (-step).log10().ceil().max(0.0) as usize,
            _ => 0,
        }
    }
}

/// Minimum and maximum of the finite values.
pub fn extent<I>(values: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = f64>,
{
    values
        .into_iter()
        .filter(|value| value.is_finite())
        .fold(None, |acc, value| match acc {
            None => Some((value, value)),
            Some((min, max)) => Some((min.min(value), max.max(value))),
        })
}

/// Step between round ticks. Positive values are the step itself, negative
/// values are the negated inverse of a sub-unit step, which keeps the
/// arithmetic exact for decimal fractions.
fn tick_increment(start: f64, stop: f64, count: usize) -> Option<f64> {
    let step = (stop - start) / count.max(1) as f64;
    if !step.is_finite() || step <= 0.0 {
        return None;
    }
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    if power >= 0.0 {
        Some(factor * 10f64.powf(power))
    } else {
        Some(-(10f64.powf(-power)) / factor)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn maps_linearly() {
        let scale = LinearScale::new((0.0, 100.0), (0.0, 1.0));
        assert!((scale.scale(50.0) - 0.5).abs() < 1e-12);
        assert!((scale.invert(0.25) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn inverted_range_flips_direction() {
        let scale = LinearScale::new((0.0, 10.0), (400.0, 0.0));
        assert_eq!(scale.scale(0.0), 400.0);
        assert_eq!(scale.scale(10.0), 0.0);
    }

    #[test]
    fn nice_rounds_outward() {
        let scale = LinearScale::new((-0.3, 0.5), (0.0, 1.0)).nice();
        assert_eq!(scale.domain(), (-0.3, 0.5));

        let scale = LinearScale::new((0.13, 9.7), (0.0, 1.0)).nice();
        assert_eq!(scale.domain(), (0.0, 10.0));
        assert_eq!(scale.range(), (0.0, 1.0));

        let scale = LinearScale::new((3.0, 97.0), (0.0, 1.0)).nice();
        assert_eq!(scale.domain(), (0.0, 100.0));
    }

    #[test]
    fn degenerate_domain_maps_to_middle() {
        let scale = LinearScale::new((2.0, 2.0), (4.0, 12.0)).nice();
        assert_eq!(scale.domain(), (2.0, 2.0));
        assert_eq!(scale.scale(2.0), 8.0);
        assert_eq!(scale.ticks(10), vec![2.0]);
    }

    #[test]
    fn ticks_cover_round_values() {
        let scale = LinearScale::new((0.0, 1.0), (0.0, 100.0));
        let ticks = scale.ticks(5);
        assert_eq!(ticks, vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
        assert_eq!(scale.tick_precision(5), 1);
    }

    #[test]
    fn extent_skips_non_finite() {
        assert_eq!(extent([1.0, f64::NAN, -2.0, 7.5]), Some((-2.0, 7.5)));
        assert_eq!(extent(std::iter::empty()), None);
    }

    proptest! {
        #[test]
        fn nice_domain_contains_the_extent(
            values in proptest::collection::vec(-1.0e6f64..1.0e6, 1..50)
        ) {
            let raw = LinearScale::from_values(values.iter().copied(), (0.0, 1.0)).unwrap();
            let nice = raw.nice();
            let (min, max) = raw.domain();
            prop_assert!(values.iter().all(|v| *v >= min && *v <= max));
            prop_assert!(nice.domain().0 <= min + 1e-9 * min.abs().max(1.0));
            prop_assert!(nice.domain().1 >= max - 1e-9 * max.abs().max(1.0));
        }

        #[test]
        fn scale_is_monotonic(a in -1.0e3f64..1.0e3, b in -1.0e3f64..1.0e3) {
            let scale = LinearScale::new((-1.0e3, 1.0e3), (4.0, 12.0)).nice();
            if a > b {
                prop_assert!(scale.scale(a) >= scale.scale(b));
            }
        }
    }
}
