//! Draw a bitmap through an affine matrix.
//!
//! Uses inverse mapping: every destination pixel center is mapped back into
//! the source with the inverted matrix and sampled there. Destination pixels
//! that land outside the source get the background color. Rows are filled in
//! parallel.

use rayon::prelude::*;

use crate::bitmap::Bitmap;
use crate::error::DomainError;
use crate::geometry::{Matrix, Point};

/// Background for pixels outside the source.
pub const BACKGROUND: [u8; 3] = [0, 0, 0];

/// Sampling method for [`draw_transformed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Fast bilinear interpolation for previews.
    #[default]
    Bilinear,
    /// Lanczos3 for high-resolution output.
    Lanczos3,
}

/// Fill `dst` with `src` drawn through `matrix` (source to destination).
///
/// # Errors
///
/// `DomainError::NonInvertibleMatrix` when the matrix collapses the source.
pub fn draw_transformed(
    src: &Bitmap,
    dst: &mut Bitmap,
    matrix: &Matrix,
    interpolation: Interpolation,
) -> Result<(), DomainError> {
    let inverse = matrix.invert().ok_or(DomainError::NonInvertibleMatrix)?;
    if dst.is_empty() {
        return Ok(());
    }

    let row_bytes = dst.width as usize * 3;
    dst.pixels
        .par_chunks_exact_mut(row_bytes)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.chunks_exact_mut(3).enumerate() {
                let p = inverse.map_point(Point::new(x as f64 + 0.5, y as f64 + 0.5));
                let pixel = match interpolation {
                    Interpolation::Bilinear => sample_bilinear(src, p.x, p.y),
                    Interpolation::Lanczos3 => sample_lanczos3(src, p.x, p.y),
                };
                out.copy_from_slice(&pixel.unwrap_or(BACKGROUND));
            }
        });
    Ok(())
}

#[inline]
fn get_pixel_f64(image: &Bitmap, px: usize, py: usize) -> [f64; 3] {
    let idx = (py * image.width as usize + px) * 3;
    [
        image.pixels[idx] as f64,
        image.pixels[idx + 1] as f64,
        image.pixels[idx + 2] as f64,
    ]
}

/// Bilinear sample at continuous coordinates where pixel `i` covers
/// `[i, i + 1)`. Samples on a pixel center return that pixel exactly.
fn sample_bilinear(image: &Bitmap, x: f64, y: f64) -> Option<[u8; 3]> {
    let (w, h) = (image.width as f64, image.height as f64);
    if image.is_empty() || x < 0.0 || y < 0.0 || x > w || y > h {
        return None;
    }

    // Shift to pixel-center coordinates and clamp neighbours at the border.
    let fx = x - 0.5;
    let fy = y - 0.5;
    let x0f = fx.floor();
    let y0f = fy.floor();
    let tx = fx - x0f;
    let ty = fy - y0f;

    let max_x = image.width as i64 - 1;
    let max_y = image.height as i64 - 1;
    let x0 = (x0f as i64).clamp(0, max_x) as usize;
    let x1 = (x0f as i64 + 1).clamp(0, max_x) as usize;
    let y0 = (y0f as i64).clamp(0, max_y) as usize;
    let y1 = (y0f as i64 + 1).clamp(0, max_y) as usize;

    let p00 = get_pixel_f64(image, x0, y0);
    let p10 = get_pixel_f64(image, x1, y0);
    let p01 = get_pixel_f64(image, x0, y1);
    let p11 = get_pixel_f64(image, x1, y1);

    let mut result = [0u8; 3];
    for i in 0..3 {
        let v = p00[i] * (1.0 - tx) * (1.0 - ty)
            + p10[i] * tx * (1.0 - ty)
            + p01[i] * (1.0 - tx) * ty
            + p11[i] * tx * ty;
        result[i] = v.clamp(0.0, 255.0).round() as u8;
    }
    Some(result)
}

/// Lanczos3 sample over a 6x6 neighbourhood. Falls back to bilinear near
/// the border.
fn sample_lanczos3(image: &Bitmap, x: f64, y: f64) -> Option<[u8; 3]> {
    let (w, h) = (image.width as i64, image.height as i64);
    let fx = x - 0.5;
    let fy = y - 0.5;

    if fx < 2.0 || fx >= (w - 3) as f64 || fy < 2.0 || fy >= (h - 3) as f64 {
        return sample_bilinear(image, x, y);
    }

    let x0 = fx.floor() as i64;
    let y0 = fy.floor() as i64;

    let mut sum = [0.0f64; 3];
    let mut weight_sum = 0.0;

    for ky in -2..=3 {
        for kx in -2..=3 {
            let px = x0 + kx;
            let py = y0 + ky;
            let weight = lanczos_weight(fx - px as f64, 3.0) * lanczos_weight(fy - py as f64, 3.0);

            let pixel = get_pixel_f64(image, px as usize, py as usize);
            sum[0] += pixel[0] * weight;
            sum[1] += pixel[1] * weight;
            sum[2] += pixel[2] * weight;
            weight_sum += weight;
        }
    }

    let mut result = [0u8; 3];
    if weight_sum > 0.0 {
        for i in 0..3 {
            result[i] = (sum[i] / weight_sum).clamp(0.0, 255.0).round() as u8;
        }
    }
    Some(result)
}

/// Lanczos kernel: `sinc(x) * sinc(x / a)` for `|x| < a`, else 0.
fn lanczos_weight(x: f64, a: f64) -> f64 {
    if x.abs() < f64::EPSILON {
        return 1.0;
    }
    if x.abs() >= a {
        return 0.0;
    }

    let pi_x = std::f64::consts::PI * x;
    let pi_x_a = pi_x / a;
    (a * pi_x.sin() * pi_x_a.sin()) / (pi_x * pi_x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(width: u32, height: u32) -> Bitmap {
        let mut pixels = Vec::with_capacity(Bitmap::byte_len(width, height));
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[(x * 10) as u8, (y * 10) as u8, 7]);
            }
        }
        Bitmap::new(width, height, pixels)
    }

    #[test]
    fn test_identity_copies_pixels() {
        let src = numbered(5, 4);
        let mut dst = Bitmap::filled(5, 4, [255, 255, 255]);
        draw_transformed(&src, &mut dst, &Matrix::identity(), Interpolation::Bilinear).unwrap();
        assert_eq!(dst, src);
    }

    #[test]
    fn test_horizontal_flip() {
        let src = numbered(4, 2);
        let mut dst = Bitmap::filled(4, 2, [0, 0, 0]);
        let flip = Matrix::scaling(-1.0, 1.0).post_translate(4.0, 0.0);
        draw_transformed(&src, &mut dst, &flip, Interpolation::Bilinear).unwrap();
        for y in 0..2 {
            for x in 0..4 {
                assert_eq!(dst.pixel(x, y), src.pixel(3 - x, y));
            }
        }
    }

    #[test]
    fn test_quarter_turn() {
        let src = numbered(3, 2);
        let mut dst = Bitmap::filled(2, 3, [0, 0, 0]);
        // Counter-clockwise on screen: the source's right column becomes the
        // top row.
        let m = Matrix::translation(-1.5, -1.0)
            .post_rotate(90.0)
            .post_translate(1.0, 1.5);
        draw_transformed(&src, &mut dst, &m, Interpolation::Bilinear).unwrap();
        assert_eq!(dst.pixel(0, 0), src.pixel(2, 0));
        assert_eq!(dst.pixel(1, 0), src.pixel(2, 1));
        assert_eq!(dst.pixel(0, 2), src.pixel(0, 0));
    }

    #[test]
    fn test_outside_is_background() {
        let src = Bitmap::filled(2, 2, [200, 200, 200]);
        let mut dst = Bitmap::filled(4, 2, [9, 9, 9]);
        draw_transformed(&src, &mut dst, &Matrix::identity(), Interpolation::Bilinear).unwrap();
        assert_eq!(dst.pixel(1, 1), [200, 200, 200]);
        assert_eq!(dst.pixel(3, 0), BACKGROUND);
    }

    #[test]
    fn test_singular_matrix_is_error() {
        let src = Bitmap::filled(2, 2, [1, 1, 1]);
        let mut dst = Bitmap::filled(2, 2, [0, 0, 0]);
        let err = draw_transformed(&src, &mut dst, &Matrix::scaling(0.0, 1.0), Interpolation::Bilinear);
        assert_eq!(err, Err(DomainError::NonInvertibleMatrix));
    }

    #[test]
    fn test_lanczos_on_flat_color() {
        let src = Bitmap::filled(16, 16, [90, 120, 150]);
        let mut dst = Bitmap::filled(8, 8, [0, 0, 0]);
        draw_transformed(&src, &mut dst, &Matrix::scaling(0.5, 0.5), Interpolation::Lanczos3).unwrap();
        assert!(dst.pixels.chunks_exact(3).all(|p| p == [90, 120, 150]));
    }

    #[test]
    fn test_lanczos_weight() {
        assert_eq!(lanczos_weight(0.0, 3.0), 1.0);
        assert_eq!(lanczos_weight(3.0, 3.0), 0.0);
        assert!(lanczos_weight(1.0, 3.0).abs() < 1e-10);
    }
}
