//! Device-pixel output scaling for backing surfaces.
//!
//! A page drawn at CSS size `w × h` gets a backing surface of roughly
//! `w·sx × h·sy` device pixels. The scale factors are rationalised into small
//! fractions so both the pixel size and the CSS size land on integer
//! boundaries with the same snapping applied to width and height.

/// Largest denominator searched by [`approximate_fraction`].
pub const FRACTION_LIMIT: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputScale {
    pub sx: f64,
    pub sy: f64,
}

impl OutputScale {
    /// Output scale for a device pixel ratio. Non-finite or non-positive
    /// ratios fall back to 1.
    pub fn new(device_pixel_ratio: f64) -> Self {
        let ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };

        Self { sx: ratio, sy: ratio }
    }

    pub fn scaled(&self) -> bool {
        self.sx != 1.0 || self.sy != 1.0
    }

    /// Clamps both factors to `sqrt(max_pixels / (width · height))` when the
    /// surface would otherwise exceed the pixel budget. A budget of 0 disables
    /// the limit. Returns whether the scale was clamped.
    pub fn limit_to_budget(&mut self, width: f64, height: f64, max_pixels: u64) -> bool {
        let area = width * height;
        if max_pixels == 0 || area <= 0.0 {
            return false;
        }

        let max_scale = (max_pixels as f64 / area).sqrt();
        if self.sx > max_scale || self.sy > max_scale {
            self.sx = max_scale;
            self.sy = max_scale;
            return true;
        }

        false
    }

    /// Affine transform handed to the engine, `None` when drawing 1:1.
    pub fn transform(&self) -> Option<[f32; 6]> {
        self.scaled().then(|| [self.sx as f32, 0.0, 0.0, self.sy as f32, 0.0, 0.0])
    }

    /// Backing and CSS sizes for a viewport of `width × height` CSS pixels.
    pub fn surface_size(&self, width: f64, height: f64) -> SurfaceSize {
        let (x_num, x_den) = approximate_fraction(self.sx);
        let (y_num, y_den) = approximate_fraction(self.sy);

        SurfaceSize {
            width: round_to_divide(width * self.sx, x_num).max(1),
            height: round_to_divide(height * self.sy, y_num).max(1),
            css_width: round_to_divide(width, x_den).max(1),
            css_height: round_to_divide(height, y_den).max(1),
        }
    }
}

impl Default for OutputScale {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Pixel dimensions of a backing surface and its CSS-visible box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
    pub css_width: u32,
    pub css_height: u32,
}

/// Best `p / q` approximation of `x` with `q <= 8`, found by walking the
/// Farey sequence (Stern–Brocot search). Integers and integer reciprocals
/// return without searching.
pub fn approximate_fraction(x: f64) -> (u32, u32) {
    if x.floor() == x {
        return (x as u32, 1);
    }

    let x_inv = 1.0 / x;
    if x_inv > FRACTION_LIMIT as f64 {
        return (1, FRACTION_LIMIT);
    } else if x_inv.floor() == x_inv {
        return (1, x_inv as u32);
    }

    let target = if x > 1.0 { x_inv } else { x };

    // a/b and c/d are neighbours in the Farey sequence.
    let (mut a, mut b, mut c, mut d) = (0_u32, 1_u32, 1_u32, 1_u32);
    loop {
        let p = a + c;
        let q = b + d;
        if q > FRACTION_LIMIT {
            break;
        }
        if target <= p as f64 / q as f64 {
            c = p;
            d = q;
        } else {
            a = p;
            b = q;
        }
    }

    let inverted = target != x;
    if target - f64::from(a) / f64::from(b) < f64::from(c) / f64::from(d) - target {
        if inverted {
            (b, a)
        } else {
            (a, b)
        }
    } else if inverted {
        (d, c)
    } else {
        (c, d)
    }
}

/// Rounds `x` up to the next multiple of `div` unless it already is one.
pub fn round_to_divide(x: f64, div: u32) -> u32 {
    let div = div.max(1) as f64;
    let remainder = x % div;

    if remainder == 0.0 {
        x.round() as u32
    } else {
        (x - remainder + div).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_and_reciprocals_take_the_fast_path() {
        assert_eq!(approximate_fraction(2.0), (2, 1));
        assert_eq!(approximate_fraction(1.0), (1, 1));
        assert_eq!(approximate_fraction(0.5), (1, 2));
        assert_eq!(approximate_fraction(0.25), (1, 4));
    }

    #[test]
    fn tiny_scales_clamp_to_the_denominator_limit() {
        assert_eq!(approximate_fraction(0.1), (1, 8));
        assert_eq!(approximate_fraction(0.01), (1, 8));
    }

    #[test]
    fn fractional_scales_pick_the_closest_farey_neighbour() {
        assert_eq!(approximate_fraction(1.5), (3, 2));
        assert_eq!(approximate_fraction(0.3), (2, 7));
        assert_eq!(approximate_fraction(1.25), (5, 4));
        assert_eq!(approximate_fraction(0.75), (3, 4));
    }

    #[test]
    fn round_to_divide_snaps_up_to_multiples() {
        assert_eq!(round_to_divide(918.0, 3), 918);
        assert_eq!(round_to_divide(100.0, 3), 102);
        assert_eq!(round_to_divide(612.5, 2), 614);
        assert_eq!(round_to_divide(7.0, 1), 7);
    }

    #[test]
    fn budget_clamps_both_axes() {
        let mut scale = OutputScale::new(2.0);
        assert!(scale.limit_to_budget(100.0, 100.0, 10_000));
        assert_eq!(scale.sx, 1.0);
        assert_eq!(scale.sy, 1.0);

        let mut roomy = OutputScale::new(2.0);
        assert!(!roomy.limit_to_budget(100.0, 100.0, 1_000_000));
        assert_eq!(roomy.sx, 2.0);

        let mut unlimited = OutputScale::new(3.0);
        assert!(!unlimited.limit_to_budget(5_000.0, 5_000.0, 0));
        assert_eq!(unlimited.sx, 3.0);
    }

    #[test]
    fn invalid_ratio_falls_back_to_unscaled() {
        let scale = OutputScale::new(f64::NAN);
        assert!(!scale.scaled());
        assert_eq!(scale.transform(), None);
        assert_eq!(OutputScale::new(-2.0), OutputScale::default());
    }

    #[test]
    fn surface_size_keeps_css_and_pixels_on_integer_grid() {
        let scale = OutputScale::new(1.5);
        let size = scale.surface_size(612.0, 792.0);

        assert_eq!(size, SurfaceSize { width: 918, height: 1188, css_width: 612, css_height: 792 });
        assert_eq!(scale.transform(), Some([1.5, 0.0, 0.0, 1.5, 0.0, 0.0]));
    }

    #[test]
    fn unscaled_surface_matches_viewport() {
        let size = OutputScale::default().surface_size(100.0, 50.0);
        assert_eq!(size, SurfaceSize { width: 100, height: 50, css_width: 100, css_height: 50 });
    }
}
