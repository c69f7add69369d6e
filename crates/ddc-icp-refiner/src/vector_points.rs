//! Extracts point clouds from PDF vector drawing commands, the optional
//! input to the refiner when the source PDF carries vector geometry rather
//! than only a raster page image.

const BEZIER_STEPS: usize = 8;

/// A primitive drawing command as recovered from a PDF content stream.
#[derive(Debug, Clone, Copy)]
pub enum DrawCommand {
    Line { from: (f64, f64), to: (f64, f64) },
    CubicBezier {
        p0: (f64, f64),
        p1: (f64, f64),
        p2: (f64, f64),
        p3: (f64, f64),
    },
    Rect { origin: (f64, f64), width: f64, height: f64 },
}

/// Samples a sequence of drawing commands into a flat point cloud: lines
/// contribute both endpoints, cubic Béziers are sampled uniformly at
/// `BEZIER_STEPS` steps, and rectangles are decomposed into their four edges
/// (each an implicit line between consecutive corners).
#[must_use]
pub fn sample_points(commands: &[DrawCommand]) -> Vec<(f64, f64)> {
    let mut points = Vec::new();
    for command in commands {
        match *command {
            DrawCommand::Line { from, to } => {
                points.push(from);
                points.push(to);
            }
            DrawCommand::CubicBezier { p0, p1, p2, p3 } => {
                for step in 0..=BEZIER_STEPS {
                    let t = step as f64 / BEZIER_STEPS as f64;
                    points.push(cubic_bezier_at(p0, p1, p2, p3, t));
                }
            }
            DrawCommand::Rect { origin, width, height } => {
                let corners = [
                    origin,
                    (origin.0 + width, origin.1),
                    (origin.0 + width, origin.1 + height),
                    (origin.0, origin.1 + height),
                ];
                for i in 0..4 {
                    points.push(corners[i]);
                    points.push(corners[(i + 1) % 4]);
                }
            }
        }
    }
    points
}

fn cubic_bezier_at(p0: (f64, f64), p1: (f64, f64), p2: (f64, f64), p3: (f64, f64), t: f64) -> (f64, f64) {
    let mt = 1.0 - t;
    let a = mt * mt * mt;
    let b = 3.0 * mt * mt * t;
    let c = 3.0 * mt * t * t;
    let d = t * t * t;
    (
        a * p0.0 + b * p1.0 + c * p2.0 + d * p3.0,
        a * p0.1 + b * p1.1 + c * p2.1 + d * p3.1,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_contributes_both_endpoints() {
        let points = sample_points(&[DrawCommand::Line { from: (0.0, 0.0), to: (1.0, 1.0) }]);
        assert_eq!(points, vec![(0.0, 0.0), (1.0, 1.0)]);
    }

    #[test]
    fn bezier_endpoints_match_control_points() {
        let points = sample_points(&[DrawCommand::CubicBezier {
            p0: (0.0, 0.0),
            p1: (1.0, 2.0),
            p2: (2.0, 2.0),
            p3: (3.0, 0.0),
        }]);
        assert_eq!(points.len(), BEZIER_STEPS + 1);
        assert_eq!(points[0], (0.0, 0.0));
        assert_eq!(points[BEZIER_STEPS], (3.0, 0.0));
    }

    #[test]
    fn rect_decomposes_to_four_edges() {
        let points = sample_points(&[DrawCommand::Rect { origin: (0.0, 0.0), width: 10.0, height: 5.0 }]);
        assert_eq!(points.len(), 8);
    }
}
