//! Dead-reckoning signed-distance transform
//!
//! Converts an 8-bit coverage bitmap (values above 127 are "inside") into
//! a quantized signed-distance field, in place. The transform tracks the
//! nearest boundary point per pixel rather than the distance itself,
//! which keeps sub-pixel accuracy through the two propagation sweeps.
//! See "The 'dead reckoning' signed distance transform" [Grevera 2004].

/// Distances are clamped to this many pixels before quantization.
const NORM_FACTOR: f32 = 13.5;

const DIST_UNIT: f32 = 1.0;
const DIST_DIAG: f32 = std::f32::consts::SQRT_2;

/// Replace `pixels` with its quantized signed-distance field.
///
/// `pixels` holds a tightly packed `width` x `height` grayscale image.
/// Does nothing when either dimension is zero or the buffer is too small.
pub fn convert_to_signed_distance_field(pixels: &mut [u8], width: u32, height: u32) {
    let w = width as usize;
    let h = height as usize;
    if w == 0 || h == 0 || pixels.len() < w * h {
        return;
    }

    let inside = |pixels: &[u8], x: usize, y: usize| pixels[y * w + x] > 0x7f;

    let max_dist = (width as f32).hypot(height as f32);
    let mut distance = vec![max_dist; w * h];
    let mut nearest = vec![(0u16, 0u16); w * h];

    // Boundary pass: a pixel whose 4-neighborhood disagrees with it sits
    // on the boundary and is its own nearest point.
    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            let me = inside(pixels, x, y);
            if inside(pixels, x - 1, y) != me
                || inside(pixels, x + 1, y) != me
                || inside(pixels, x, y - 1) != me
                || inside(pixels, x, y + 1) != me
            {
                distance[y * w + x] = 0.0;
                nearest[y * w + x] = (x as u16, y as u16);
            }
        }
    }

    let relax = |distance: &mut [f32],
                 nearest: &mut [(u16, u16)],
                 x: isize,
                 y: isize,
                 nx: isize,
                 ny: isize,
                 step: f32| {
        let idx = y as usize * w + x as usize;
        let nidx = ny as usize * w + nx as usize;
        if distance[nidx] + step < distance[idx] {
            nearest[idx] = nearest[nidx];
            let (px, py) = nearest[idx];
            distance[idx] = (x as f32 - px as f32).hypot(y as f32 - py as f32);
        }
    };

    let wi = w as isize;
    let hi = h as isize;

    // Forward sweep: up-left, up, up-right, left.
    let mut y = 1isize;
    while y < hi - 2 {
        let mut x = 1isize;
        while x < wi - 2 {
            relax(&mut distance, &mut nearest, x, y, x - 1, y - 1, DIST_DIAG);
            relax(&mut distance, &mut nearest, x, y, x, y - 1, DIST_UNIT);
            relax(&mut distance, &mut nearest, x, y, x + 1, y - 1, DIST_DIAG);
            relax(&mut distance, &mut nearest, x, y, x - 1, y, DIST_UNIT);
            x += 1;
        }
        y += 1;
    }

    // Backward sweep: right, down-left, down, down-right. Signed indices
    // keep the countdown to 1 from wrapping.
    let mut y = hi - 2;
    while y >= 1 {
        let mut x = wi - 2;
        while x >= 1 {
            relax(&mut distance, &mut nearest, x, y, x + 1, y, DIST_UNIT);
            relax(&mut distance, &mut nearest, x, y, x - 1, y + 1, DIST_DIAG);
            relax(&mut distance, &mut nearest, x, y, x, y + 1, DIST_UNIT);
            relax(&mut distance, &mut nearest, x, y, x + 1, y + 1, DIST_DIAG);
            x -= 1;
        }
        y -= 1;
    }

    // Negate outside distances, clamp, and quantize into the byte range.
    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            let mut dist = distance[idx];
            if !inside(pixels, x, y) {
                dist = -dist;
            }
            let clamped = dist.clamp(-NORM_FACTOR, NORM_FACTOR);
            let scaled = clamped / NORM_FACTOR;
            pixels[idx] = (((scaled + 1.0) / 2.0) * 255.0) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_do_nothing() {
        convert_to_signed_distance_field(&mut [], 0, 0);
        let mut pixels = [1u8, 2, 3];
        convert_to_signed_distance_field(&mut pixels, 0, 3);
        assert_eq!(pixels, [1, 2, 3]);
        // Undersized buffer is left alone too.
        convert_to_signed_distance_field(&mut pixels, 4, 4);
        assert_eq!(pixels, [1, 2, 3]);
    }

    #[test]
    fn all_inside_quantizes_to_positive_extreme() {
        // hypot(16, 16) exceeds the clamp, so distances saturate.
        let mut pixels = vec![255u8; 16 * 16];
        convert_to_signed_distance_field(&mut pixels, 16, 16);
        assert!(pixels.iter().all(|&p| p == 255), "pixels: {pixels:?}");
    }

    #[test]
    fn all_outside_quantizes_to_negative_extreme() {
        let mut pixels = vec![0u8; 32 * 32];
        convert_to_signed_distance_field(&mut pixels, 32, 32);
        assert!(pixels.iter().all(|&p| p == 0));
    }

    #[test]
    fn uniform_bitmaps_are_idempotent() {
        let mut once = vec![200u8; 16 * 16];
        convert_to_signed_distance_field(&mut once, 16, 16);
        let mut twice = once.clone();
        convert_to_signed_distance_field(&mut twice, 16, 16);
        assert_eq!(once, twice);
    }

    #[test]
    fn checkerboard_stays_near_midpoint() {
        // Every interior pixel of a checkerboard touches a boundary, so
        // its distance is zero and quantizes next to the midpoint.
        let mut pixels = [0u8; 16];
        for y in 0..4 {
            for x in 0..4 {
                pixels[y * 4 + x] = if (x + y) % 2 == 0 { 0 } else { 255 };
            }
        }
        convert_to_signed_distance_field(&mut pixels, 4, 4);
        for y in 1..3 {
            for x in 1..3 {
                let value = pixels[y * 4 + x];
                assert!(
                    (112u8..=144u8).contains(&value),
                    "pixel ({x},{y}) = {value}"
                );
            }
        }
    }

    #[test]
    fn output_is_always_a_valid_byte_gradient() {
        // A filled square in the middle of an empty field: inside pixels
        // land above the midpoint, far outside pixels below it.
        let size = 32usize;
        let mut pixels = vec![0u8; size * size];
        for y in 10..22 {
            for x in 10..22 {
                pixels[y * size + x] = 255;
            }
        }
        convert_to_signed_distance_field(&mut pixels, size as u32, size as u32);
        assert!(pixels[15 * size + 15] > 127, "deep inside should be positive");
        assert!(pixels[2 * size + 2] < 127, "far outside should be negative");
    }

    #[test]
    fn tiny_bitmaps_do_not_panic() {
        for (w, h) in [(1u32, 1u32), (1, 8), (8, 1), (2, 2), (3, 3)] {
            let mut pixels = vec![255u8; (w * h) as usize];
            convert_to_signed_distance_field(&mut pixels, w, h);
            assert_eq!(pixels.len(), (w * h) as usize);
        }
    }
}
