//! Property tests for the coordinate transforms.

use labelpack::dataset::{BBoxXYWH, Normalized, Pixel};
use proptest::prelude::*;

const EPSILON: f64 = 1e-9;

proptest! {
    /// Corner form and center form are inverses of each other.
    #[test]
    fn center_form_roundtrips(
        x in -1000.0f64..1000.0,
        y in -1000.0f64..1000.0,
        w in 0.001f64..1000.0,
        h in 0.001f64..1000.0,
    ) {
        let bbox: BBoxXYWH<Pixel> = BBoxXYWH::from_xywh(x, y, w, h);
        let (cx, cy, cw, ch) = bbox.to_cxcywh();
        let restored: BBoxXYWH<Pixel> = BBoxXYWH::from_cxcywh(cx, cy, cw, ch);

        prop_assert!((restored.x() - x).abs() < EPSILON);
        prop_assert!((restored.y() - y).abs() < EPSILON);
        prop_assert!((restored.width - w).abs() < EPSILON);
        prop_assert!((restored.height - h).abs() < EPSILON);
    }

    /// Normalizing and denormalizing against the same image dimensions is
    /// the identity, up to floating-point noise.
    #[test]
    fn normalization_roundtrips(
        x in 0.0f64..4000.0,
        y in 0.0f64..4000.0,
        w in 0.001f64..4000.0,
        h in 0.001f64..4000.0,
        image_w in 1u32..8000,
        image_h in 1u32..8000,
    ) {
        let bbox: BBoxXYWH<Pixel> = BBoxXYWH::from_xywh(x, y, w, h);
        let norm: BBoxXYWH<Normalized> =
            bbox.to_normalized(image_w as f64, image_h as f64);
        let back = norm.to_pixel(image_w as f64, image_h as f64);

        let tolerance = 1e-9 * (1.0 + x.abs() + y.abs() + w + h);
        prop_assert!((back.x() - x).abs() < tolerance);
        prop_assert!((back.y() - y).abs() < tolerance);
        prop_assert!((back.width - w).abs() < tolerance);
        prop_assert!((back.height - h).abs() < tolerance);
    }

    /// A box that fits within the image normalizes to values in [0, 1].
    #[test]
    fn in_bounds_boxes_normalize_into_unit_range(
        image_w in 2u32..4000,
        image_h in 2u32..4000,
        w_seed in 0u32..u32::MAX,
        h_seed in 0u32..u32::MAX,
        x_seed in 0u32..u32::MAX,
        y_seed in 0u32..u32::MAX,
    ) {
        // Construct an integral box guaranteed to fit; whole-number pixel
        // values keep the bounds arithmetic exact in f64.
        let w = (w_seed % image_w + 1) as f64;
        let h = (h_seed % image_h + 1) as f64;
        let x = (x_seed % (image_w - w as u32 + 1)) as f64;
        let y = (y_seed % (image_h - h as u32 + 1)) as f64;
        let bbox: BBoxXYWH<Pixel> = BBoxXYWH::from_xywh(x, y, w, h);

        prop_assert!(bbox.fits_within(image_w as f64, image_h as f64));

        let norm = bbox.to_normalized(image_w as f64, image_h as f64);
        prop_assert!(norm.x() >= 0.0 && norm.xmax() <= 1.0 + EPSILON);
        prop_assert!(norm.y() >= 0.0 && norm.ymax() <= 1.0 + EPSILON);
    }

    /// The bounds filter rejects anything poking outside the image.
    #[test]
    fn bounds_filter_rejects_spilling_boxes(
        image_w in 10u32..1000,
        image_h in 10u32..1000,
        overhang in 0.001f64..500.0,
    ) {
        let right_spill: BBoxXYWH<Pixel> = BBoxXYWH::from_xywh(
            image_w as f64 - 5.0,
            0.0,
            5.0 + overhang,
            5.0,
        );
        prop_assert!(!right_spill.fits_within(image_w as f64, image_h as f64));

        let negative_origin: BBoxXYWH<Pixel> =
            BBoxXYWH::from_xywh(-overhang, 0.0, 5.0, 5.0);
        prop_assert!(!negative_origin.fits_within(image_w as f64, image_h as f64));
    }
}
