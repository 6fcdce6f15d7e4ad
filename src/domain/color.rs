//! Piecewise HSV color scale over whole percentage points.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::number::{hundred, round_half_even};

pub const DEFAULT_ANCHORS: [(u32, &str); 3] = [(60, "#F5C7C3"), (80, "#FCE8AF"), (100, "#B6E1CC")];
pub const DEFAULT_UNGRADED: &str = "#FFFFFF";

type Hsv = (f64, f64, f64);

/// Maps a fraction to an HTML color, interpolating between anchors.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    lowest: i64,
    /// One color per percentage point from `lowest` up to the last anchor
    colors: Vec<String>,
    ungraded: String,
}

impl Default for ColorScale {
    fn default() -> Self {
        let anchors: Vec<(i64, &str)> = DEFAULT_ANCHORS
            .iter()
            .map(|&(at, color)| (i64::from(at), color))
            .collect();
        Self::new(&anchors, DEFAULT_UNGRADED).expect("default color anchors are valid")
    }
}

impl ColorScale {
    /// Anchors are `(percent, "#RRGGBB")` in increasing percent order.
    pub fn new(anchors: &[(i64, &str)], ungraded: &str) -> DomainResult<Self> {
        let invalid = |msg: String| DomainError::InvalidScale(msg);
        if anchors.is_empty() {
            return Err(invalid("at least one color anchor is required".into()));
        }
        if anchors.windows(2).any(|w| w[0].0 >= w[1].0) {
            return Err(invalid("color anchors must increase".into()));
        }
        parse_html(ungraded).ok_or_else(|| invalid(format!("bad color {ungraded:?}")))?;
        let hsv: Vec<(i64, Hsv)> = anchors
            .iter()
            .map(|&(at, html)| {
                parse_html(html)
                    .map(|rgb| (at, rgb_to_hsv(rgb)))
                    .ok_or_else(|| invalid(format!("bad color {html:?}")))
            })
            .collect::<DomainResult<_>>()?;

        let mut colors = Vec::new();
        for pair in hsv.windows(2) {
            let ((lower, low), (upper, high)) = (pair[0], pair[1]);
            for percent in lower..upper {
                let weight = (percent - lower) as f64 / (upper - lower) as f64;
                let mix = |a: f64, b: f64| (1.0 - weight) * a + weight * b;
                colors.push(to_html(hsv_to_rgb((
                    mix(low.0, high.0),
                    mix(low.1, high.1),
                    mix(low.2, high.2),
                ))));
            }
        }
        let (_, last) = hsv[hsv.len() - 1];
        colors.push(to_html(hsv_to_rgb(last)));

        Ok(Self {
            lowest: hsv[0].0,
            colors,
            ungraded: ungraded.to_string(),
        })
    }

    pub fn ungraded(&self) -> &str {
        &self.ungraded
    }

    /// Color for a fraction at whole-percent resolution (ties to even),
    /// clamped to the anchor range.
    pub fn color_for(&self, fraction: &BigRational) -> &str {
        let percent = round_half_even(&(fraction * hundred()));
        let offset = percent - BigInt::from(self.lowest);
        let last = self.colors.len() - 1;
        let offset = if offset.is_negative() {
            0
        } else {
            offset.to_usize().map_or(last, |o| o.min(last))
        };
        &self.colors[offset]
    }
}

fn parse_html(color: &str) -> Option<(f64, f64, f64)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok().map(|c| f64::from(c) / 255.0);
    Some((channel(0)?, channel(2)?, channel(4)?))
}

fn to_html((r, g, b): (f64, f64, f64)) -> String {
    let byte = |c: f64| (c * 255.0).round().clamp(0.0, 255.0) as u8;
    format!("#{:02x}{:02x}{:02x}", byte(r), byte(g), byte(b))
}

fn rgb_to_hsv((r, g, b): (f64, f64, f64)) -> Hsv {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if max == min {
        return (0.0, 0.0, max);
    }
    let range = max - min;
    let (rc, gc, bc) = ((max - r) / range, (max - g) / range, (max - b) / range);
    let h = if r == max {
        bc - gc
    } else if g == max {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };
    ((h / 6.0).rem_euclid(1.0), range / max, max)
}

fn hsv_to_rgb((h, s, v): Hsv) -> (f64, f64, f64) {
    if s == 0.0 {
        return (v, v, v);
    }
    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let (p, q, t) = (v * (1.0 - s), v * (1.0 - s * f), v * (1.0 - s * (1.0 - f)));
    match (sector as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(n: i64, d: i64) -> BigRational {
        BigRational::new(n.into(), d.into())
    }

    #[test]
    fn test_anchors_map_to_their_colors() {
        let scale = ColorScale::default();
        assert_eq!(scale.color_for(&ratio(60, 100)), "#f5c7c3");
        assert_eq!(scale.color_for(&ratio(80, 100)), "#fce8af");
        assert_eq!(scale.color_for(&ratio(1, 1)), "#b6e1cc");
    }

    #[test]
    fn test_out_of_range_clamps() {
        let scale = ColorScale::default();
        assert_eq!(scale.color_for(&ratio(3, 10)), "#f5c7c3");
        assert_eq!(scale.color_for(&ratio(-1, 10)), "#f5c7c3");
        assert_eq!(scale.color_for(&ratio(12, 10)), "#b6e1cc");
    }

    #[test]
    fn test_interpolates_between_anchors() {
        let scale = ColorScale::default();
        let mid = scale.color_for(&ratio(70, 100));
        assert_ne!(mid, "#f5c7c3");
        assert_ne!(mid, "#fce8af");
        // 69.6% rounds to the 70% bucket
        assert_eq!(scale.color_for(&ratio(696, 1000)), mid);
    }

    #[test]
    fn test_half_percent_ties_round_to_even() {
        let scale = ColorScale::default();
        assert_eq!(scale.color_for(&ratio(705, 1000)), scale.color_for(&ratio(70, 100)));
        assert_eq!(scale.color_for(&ratio(715, 1000)), scale.color_for(&ratio(72, 100)));
    }

    #[test]
    fn test_rejects_bad_anchors() {
        assert!(ColorScale::new(&[], "#FFFFFF").is_err());
        assert!(ColorScale::new(&[(80, "#FFFFFF"), (60, "#000000")], "#FFFFFF").is_err());
        assert!(ColorScale::new(&[(60, "red")], "#FFFFFF").is_err());
        assert!(ColorScale::new(&[(60, "#FFFFFF")], "white").is_err());
    }
}
