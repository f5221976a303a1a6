// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use strict_num::ApproxEqUlps;
pub use tiny_skia_path::{NonZeroRect, Rect, Size, Transform};

use crate::{Align, AspectRatio};

/// Approximate zero equality comparisons.
pub trait ApproxZeroUlps: ApproxEqUlps {
    /// Checks if the number is approximately zero.
    fn approx_zero_ulps(&self, ulps: <Self::Flt as strict_num::Ulps>::U) -> bool;
}

impl ApproxZeroUlps for f32 {
    fn approx_zero_ulps(&self, ulps: i32) -> bool {
        self.approx_eq_ulps(&0.0, ulps)
    }
}

/// Checks that a length is positive and finite.
pub trait IsValidLength {
    /// Checks that the current number is > 0.
    fn is_valid_length(&self) -> bool;
}

impl IsValidLength for f32 {
    #[inline]
    fn is_valid_length(&self) -> bool {
        *self > 0.0 && self.is_finite()
    }
}

/// A `viewBox` with its `preserveAspectRatio`.
#[derive(Clone, Copy, Debug)]
pub struct ViewBox {
    /// Value of the `viewBox` attribute.
    pub rect: NonZeroRect,

    /// Value of the `preserveAspectRatio` attribute.
    pub aspect: AspectRatio,
}

impl ViewBox {
    /// Returns a transform that maps the view box onto a viewport of `size`.
    pub fn to_transform(&self, size: Size) -> Transform {
        let vb = self.rect;
        let mut sx = size.width() / vb.width();
        let mut sy = size.height() / vb.height();
        if self.aspect.align != Align::None {
            let s = if self.aspect.slice { sx.max(sy) } else { sx.min(sy) };
            sx = s;
            sy = s;
        }

        // Free space left in the viewport after scaling.
        let free_x = size.width() - vb.width() * sx;
        let free_y = size.height() - vb.height() * sy;
        let (fx, fy) = align_factors(self.aspect.align);

        Transform::from_row(
            sx,
            0.0,
            0.0,
            sy,
            free_x * fx - vb.x() * sx,
            free_y * fy - vb.y() * sy,
        )
    }
}

// Shares of the free space placed before the content.
fn align_factors(align: Align) -> (f32, f32) {
    match align {
        Align::None | Align::XMinYMin => (0.0, 0.0),
        Align::XMidYMin => (0.5, 0.0),
        Align::XMaxYMin => (1.0, 0.0),
        Align::XMinYMid => (0.0, 0.5),
        Align::XMidYMid => (0.5, 0.5),
        Align::XMaxYMid => (1.0, 0.5),
        Align::XMinYMax => (0.0, 1.0),
        Align::XMidYMax => (0.5, 1.0),
        Align::XMaxYMax => (1.0, 1.0),
    }
}

/// Returns the smallest rectangle that contains both `a` and `b`.
pub fn rect_union(a: Rect, b: Rect) -> Rect {
    Rect::from_ltrb(
        a.left().min(b.left()),
        a.top().min(b.top()),
        a.right().max(b.right()),
        a.bottom().max(b.bottom()),
    )
    .unwrap_or(a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_of_rects() {
        let a = Rect::from_xywh(0.0, 0.0, 10.0, 10.0).unwrap();
        let b = Rect::from_xywh(-5.0, 5.0, 10.0, 20.0).unwrap();
        assert_eq!(rect_union(a, b), Rect::from_ltrb(-5.0, 0.0, 10.0, 25.0).unwrap());
    }

    #[test]
    fn meet_centers_content() {
        let vb = ViewBox {
            rect: NonZeroRect::from_xywh(0.0, 0.0, 10.0, 20.0).unwrap(),
            aspect: AspectRatio {
                defer: false,
                align: Align::XMidYMid,
                slice: false,
            },
        };
        let ts = vb.to_transform(Size::from_wh(100.0, 100.0).unwrap());
        assert_eq!(ts, Transform::from_row(5.0, 0.0, 0.0, 5.0, 25.0, 0.0));
    }

    #[test]
    fn slice_aligns_to_the_end() {
        let vb = ViewBox {
            rect: NonZeroRect::from_xywh(0.0, 0.0, 10.0, 20.0).unwrap(),
            aspect: AspectRatio {
                defer: false,
                align: Align::XMaxYMax,
                slice: true,
            },
        };
        let ts = vb.to_transform(Size::from_wh(100.0, 100.0).unwrap());
        assert_eq!(ts, Transform::from_row(10.0, 0.0, 0.0, 10.0, 0.0, -100.0));
    }
}
