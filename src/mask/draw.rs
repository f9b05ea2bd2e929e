//! Low-level raster primitives for mask building.
//!
//! Polygons are filled with [`imageproc`]'s scanline fill; polylines are
//! stroked as per-segment quads with round joints so the result matches a
//! thick-pen stroke. Pixels that fall beyond the first or last vertex can
//! be trimmed off to square the line caps.

use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_polygon_mut, Canvas};
use imageproc::point::Point as PixelPoint;

use crate::page::Point;

/// Rounds floating-point page coordinates to pixel coordinates.
pub(crate) fn rounded(coords: &[Point]) -> Vec<PixelPoint<i32>> {
    coords
        .iter()
        .map(|p| PixelPoint::new(p.x.round() as i32, p.y.round() as i32))
        .collect()
}

/// Fills a polygon outline with the given color.
///
/// Degenerate outlines (fewer than three distinct vertices after rounding)
/// paint nothing. A repeated closing vertex is dropped first.
pub fn fill_polygon<C>(canvas: &mut C, coords: &[Point], color: C::Pixel)
where
    C: Canvas,
{
    let mut poly = rounded(coords);
    poly.dedup();
    if poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }
    if poly.len() < 3 {
        return;
    }
    draw_polygon_mut(canvas, &poly, color);
}

/// Draws a filled disc centered on a page coordinate.
pub fn draw_disc<C>(canvas: &mut C, center: Point, radius: i32, color: C::Pixel)
where
    C: Canvas,
{
    draw_filled_circle_mut(
        canvas,
        (center.x.round() as i32, center.y.round() as i32),
        radius,
        color,
    );
}

/// Strokes a polyline into a fresh binary mask of shape `size` (height,
/// width). Lit pixels hold 1.
///
/// Each segment is painted as a filled quad of the given width with round
/// discs at every vertex. With `square` set, pixels whose closest point on
/// the polyline lies beyond the first or last vertex are cleared again,
/// which squares off the line caps.
pub fn stroke_polyline(size: (u32, u32), coords: &[Point], width: u32, square: bool) -> GrayImage {
    let (height, img_width) = size;
    let mut mask = GrayImage::new(img_width, height);
    if coords.len() < 2 {
        return mask;
    }

    let half = width as f32 / 2.0;
    let on = image::Luma([1u8]);
    for pair in coords.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let len = (dx * dx + dy * dy).sqrt();
        if len > f32::EPSILON {
            let (nx, ny) = (-dy / len * half, dx / len * half);
            let quad = [
                Point::new(a.x + nx, a.y + ny),
                Point::new(b.x + nx, b.y + ny),
                Point::new(b.x - nx, b.y - ny),
                Point::new(a.x - nx, a.y - ny),
            ];
            fill_polygon(&mut mask, &quad, on);
        }
    }
    let radius = (half.round() as i32).max(0);
    for point in coords {
        draw_disc(&mut mask, *point, radius, on);
    }

    if square {
        for y in 0..height {
            for x in 0..img_width {
                if mask.get_pixel(x, y)[0] != 0 && beyond_endpoints(coords, x, y) {
                    mask.put_pixel(x, y, image::Luma([0]));
                }
            }
        }
    }

    mask
}

/// Writes a stroked binary mask onto a target label mask with the given
/// value, overwriting whatever was there. Returns whether any stroked pixel
/// was already labeled.
pub fn compose_stroke(target: &mut GrayImage, stroke: &GrayImage, value: u8) -> bool {
    let mut overlap = false;
    for (x, y, pixel) in stroke.enumerate_pixels() {
        if pixel[0] != 0 {
            if target.get_pixel(x, y)[0] != 0 {
                overlap = true;
            }
            target.put_pixel(x, y, image::Luma([value]));
        }
    }
    overlap
}

/// RGB variant of [`compose_stroke`] for panoptic masks.
pub fn compose_stroke_rgb(target: &mut RgbImage, stroke: &GrayImage, color: Rgb<u8>) -> bool {
    let mut overlap = false;
    for (x, y, pixel) in stroke.enumerate_pixels() {
        if pixel[0] != 0 {
            if target.get_pixel(x, y).0 != [0, 0, 0] {
                overlap = true;
            }
            target.put_pixel(x, y, color);
        }
    }
    overlap
}

/// Encodes a segment id as an RGB color, least significant byte in the red
/// channel. The COCO panoptic convention.
pub fn id_to_rgb(id: u32) -> Rgb<u8> {
    Rgb([
        (id % 256) as u8,
        ((id / 256) % 256) as u8,
        ((id / 65536) % 256) as u8,
    ])
}

/// Decodes a panoptic mask color back to its segment id. Inverse of
/// [`id_to_rgb`].
pub fn rgb_to_id(color: Rgb<u8>) -> u32 {
    u32::from(color.0[0]) + 256 * u32::from(color.0[1]) + 65536 * u32::from(color.0[2])
}

/// The closest segment of the polyline to the pixel, with the unclamped
/// projection parameter on that segment.
fn nearest_segment(coords: &[Point], px: f32, py: f32) -> (usize, f32) {
    let mut best = (0, 0.0);
    let mut best_dist = f32::INFINITY;
    for (idx, pair) in coords.windows(2).enumerate() {
        let (a, b) = (pair[0], pair[1]);
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let len_sq = dx * dx + dy * dy;
        let t = if len_sq > f32::EPSILON {
            ((px - a.x) * dx + (py - a.y) * dy) / len_sq
        } else {
            0.0
        };
        let clamped = t.clamp(0.0, 1.0);
        let (cx, cy) = (a.x + clamped * dx, a.y + clamped * dy);
        let dist = (px - cx).powi(2) + (py - cy).powi(2);
        if dist < best_dist {
            best_dist = dist;
            best = (idx, t);
        }
    }
    best
}

/// Whether a stroked pixel projects past the first or last vertex of the
/// polyline.
fn beyond_endpoints(coords: &[Point], x: u32, y: u32) -> bool {
    let (idx, t) = nearest_segment(coords, x as f32, y as f32);
    (idx == 0 && t < 0.0) || (idx == coords.len().saturating_sub(2) && t > 1.0)
}

/// Whether a stroked pixel sits above the closest segment of the polyline.
/// Pixels exactly on the line count as above.
pub fn is_above(coords: &[Point], x: u32, y: u32) -> bool {
    let (px, py) = (x as f32, y as f32);
    let (idx, _) = nearest_segment(coords, px, py);
    let (a, b) = (coords[idx], coords[idx + 1]);
    let cross = (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x);
    cross <= 0.0
}
