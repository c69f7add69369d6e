//! Edge reinforcement: detects strong gradients in each warped grayscale,
//! masks them by ink density, thresholds, and unions the two sides so thin
//! strokes stay visible through the colored wash.

use image::GrayImage;
use imageproc::gradients::sobel_gradients;

use crate::mask::InkMask;

/// Binary (0 or 255) edge mask: `sobel_magnitude(gray) * ink_mask > threshold`.
#[must_use]
pub fn edge_mask(gray: &GrayImage, ink: &InkMask, threshold: u8) -> InkMask {
    let gradients = sobel_gradients(gray);
    let (w, h) = gray.dimensions();
    let mut values = vec![0u8; (w * h) as usize];

    let max_magnitude = gradients.iter().copied().max().unwrap_or(1).max(1);
    for y in 0..h {
        for x in 0..w {
            let magnitude = gradients.get_pixel(x, y).0[0];
            let normalized = (u32::from(magnitude) * 255 / u32::from(max_magnitude)) as u8;
            let weighted = (u16::from(normalized) * u16::from(ink.get(x, y)) / 255) as u8;
            values[(y * w + x) as usize] = if weighted > threshold { 255 } else { 0 };
        }
    }

    InkMask { width: w, height: h, values }
}

/// Pixelwise union (max) of two binary edge masks.
#[must_use]
pub fn union(a: &InkMask, b: &InkMask) -> InkMask {
    let values = a.values.iter().zip(b.values.iter()).map(|(x, y)| (*x).max(*y)).collect();
    InkMask { width: a.width, height: a.height, values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn blank_image_has_no_edges() {
        let gray = GrayImage::from_pixel(16, 16, Luma([255u8]));
        let ink = InkMask { width: 16, height: 16, values: vec![255u8; 16 * 16] };
        let edges = edge_mask(&gray, &ink, 40);
        assert!(edges.values.iter().all(|&v| v == 0));
    }

    #[test]
    fn sharp_boundary_produces_edge_pixels() {
        let mut gray = GrayImage::from_pixel(16, 16, Luma([255u8]));
        for y in 0..16 {
            for x in 8..16 {
                gray.put_pixel(x, y, Luma([0u8]));
            }
        }
        let ink = InkMask { width: 16, height: 16, values: vec![255u8; 16 * 16] };
        let edges = edge_mask(&gray, &ink, 40);
        assert!(edges.values.iter().any(|&v| v == 255));
    }

    #[test]
    fn union_keeps_pixels_present_in_either_mask() {
        let a = InkMask { width: 2, height: 1, values: vec![255, 0] };
        let b = InkMask { width: 2, height: 1, values: vec![0, 255] };
        let u = union(&a, &b);
        assert_eq!(u.values, vec![255, 255]);
    }
}
