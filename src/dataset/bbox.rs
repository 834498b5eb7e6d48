//! Bounding box types in canonical XYWH format.
//!
//! The canonical box is corner-based: `(x, y)` is the top-left corner and
//! `width`/`height` extend right and down. YOLO's center-based form exists
//! only at the codec boundary, via the `cxcywh` conversions below.

use super::coord::Coord;
use super::{Normalized, Pixel};

/// An axis-aligned bounding box in XYWH format (top-left origin).
///
/// The `TSpace` parameter should be either [`Pixel`](super::Pixel) or
/// [`Normalized`](super::Normalized), ensuring type safety across
/// coordinate spaces.
///
/// Note: this type does NOT enforce positive sizes in the constructor,
/// allowing "malformed" boxes to exist in memory. This is intentional -
/// the bounds filter and the validator catch and report these rather than
/// preventing them from being represented.
#[derive(Clone, Copy, PartialEq)]
pub struct BBoxXYWH<TSpace> {
    pub origin: Coord<TSpace>,
    pub width: f64,
    pub height: f64,
}

impl<TSpace> BBoxXYWH<TSpace> {
    /// Creates a new bounding box from a top-left corner and size.
    #[inline]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Coord::new(x, y),
            width,
            height,
        }
    }

    /// Creates a bounding box from center-form values (cx, cy, w, h).
    #[inline]
    pub fn from_cxcywh(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self::from_xywh(cx - width / 2.0, cy - height / 2.0, width, height)
    }

    /// Converts to center-form values (cx, cy, w, h).
    #[inline]
    pub fn to_cxcywh(&self) -> (f64, f64, f64, f64) {
        (
            self.origin.x + self.width / 2.0,
            self.origin.y + self.height / 2.0,
            self.width,
            self.height,
        )
    }

    /// Returns the x coordinate of the top-left corner.
    #[inline]
    pub fn x(&self) -> f64 {
        self.origin.x
    }

    /// Returns the y coordinate of the top-left corner.
    #[inline]
    pub fn y(&self) -> f64 {
        self.origin.y
    }

    /// Returns the x coordinate of the bottom-right corner.
    #[inline]
    pub fn xmax(&self) -> f64 {
        self.origin.x + self.width
    }

    /// Returns the y coordinate of the bottom-right corner.
    #[inline]
    pub fn ymax(&self) -> f64 {
        self.origin.y + self.height
    }

    /// Returns the area of the bounding box.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Returns true if all values are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.origin.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

impl<TSpace> std::fmt::Debug for BBoxXYWH<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBoxXYWH")
            .field("x", &self.origin.x)
            .field("y", &self.origin.y)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl<TSpace> Default for BBoxXYWH<TSpace> {
    fn default() -> Self {
        Self::from_xywh(0.0, 0.0, 0.0, 0.0)
    }
}

impl BBoxXYWH<Pixel> {
    /// Converts pixel coordinates to normalized coordinates.
    pub fn to_normalized(&self, image_width: f64, image_height: f64) -> BBoxXYWH<Normalized> {
        BBoxXYWH::from_xywh(
            self.origin.x / image_width,
            self.origin.y / image_height,
            self.width / image_width,
            self.height / image_height,
        )
    }

    /// Returns true if the box lies entirely within an image of the given
    /// dimensions and has positive size.
    ///
    /// This is the bounds invariant applied before every export: boxes that
    /// fail it are dropped, never clamped.
    pub fn fits_within(&self, image_width: f64, image_height: f64) -> bool {
        self.origin.x >= 0.0
            && self.origin.y >= 0.0
            && self.xmax() <= image_width
            && self.ymax() <= image_height
            && self.width > 0.0
            && self.height > 0.0
    }
}

impl BBoxXYWH<Normalized> {
    /// Converts normalized coordinates to pixel coordinates.
    pub fn to_pixel(&self, image_width: f64, image_height: f64) -> BBoxXYWH<Pixel> {
        BBoxXYWH::from_xywh(
            self.origin.x * image_width,
            self.origin.y * image_height,
            self.width * image_width,
            self.height * image_height,
        )
    }
}
