//! End-to-end overlay scenarios with literal test vectors: translation,
//! addition, removal.

use ddc_common::SimilarityTransform;
use ddc_overlay_compositor::{classify, ComposeParams};
use ddc_raster_gateway::{Channels, Raster};

fn white_canvas(size: u32) -> Vec<u8> {
    vec![255u8; (size * size * 4) as usize]
}

fn paint_square(pixels: &mut [u8], size: u32, square: (u32, u32, u32, u32)) {
    let (sx, sy, sw, sh) = square;
    for y in sy..sy + sh {
        for x in sx..sx + sw {
            let idx = ((y * size + x) as usize) * 4;
            pixels[idx..idx + 4].copy_from_slice(&[0, 0, 0, 255]);
        }
    }
}

#[test]
fn removal_produces_red_region_with_no_green() {
    let size = 120;
    let mut old_pixels = white_canvas(size);
    paint_square(&mut old_pixels, size, (20, 20, 20, 20));
    let old = Raster::new(size, size, Channels::Rgba, old_pixels, 1.0);

    // new is old with that region erased.
    let new_pixels = white_canvas(size);
    let new = Raster::new(size, size, Channels::Rgba, new_pixels, 1.0);

    let params = ComposeParams { draw_lines: false, vertical_auto_correct: false, ..ComposeParams::default() };
    let classification = classify(&old, &new, &SimilarityTransform::IDENTITY, &params).unwrap();

    assert!(classification.old_only.get(30, 30) > 0);
    assert_eq!(classification.new_only.get(30, 30), 0);
}

#[test]
fn addition_produces_green_region_with_no_red() {
    let size = 120;
    let old_pixels = white_canvas(size);
    let old = Raster::new(size, size, Channels::Rgba, old_pixels, 1.0);

    let mut new_pixels = white_canvas(size);
    paint_square(&mut new_pixels, size, (60, 60, 20, 20));
    let new = Raster::new(size, size, Channels::Rgba, new_pixels, 1.0);

    let params = ComposeParams { draw_lines: false, vertical_auto_correct: false, ..ComposeParams::default() };
    let classification = classify(&old, &new, &SimilarityTransform::IDENTITY, &params).unwrap();

    assert!(classification.new_only.get(70, 70) > 0);
    assert_eq!(classification.old_only.get(70, 70), 0);
}

#[test]
fn pure_translation_leaves_gray_overlap_between_old_and_new_positions() {
    let size = 120;
    let mut old_pixels = white_canvas(size);
    paint_square(&mut old_pixels, size, (40, 40, 20, 20));
    let old = Raster::new(size, size, Channels::Rgba, old_pixels, 1.0);

    let mut new_pixels = white_canvas(size);
    paint_square(&mut new_pixels, size, (50, 40, 20, 20)); // +10 px right
    let new = Raster::new(size, size, Channels::Rgba, new_pixels, 1.0);

    let transform = SimilarityTransform { scale: 1.0, rotation_deg: 0.0, tx: 10.0, ty: 0.0 };
    let params = ComposeParams { draw_lines: false, vertical_auto_correct: false, ..ComposeParams::default() };
    let classification = classify(&old, &new, &transform, &params).unwrap();

    // The warped-old square now coincides with new's square: the shared
    // region should register as overlap, not as an addition or removal.
    assert!(classification.overlap.get(55, 50) > 0);
}
