//! Frame type and color conversion — YUYV and BGR to packed RGB.

/// A captured camera frame in packed RGB8.
#[derive(Clone)]
pub struct Frame {
    /// RGB pixel data (width * height * 3 bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: std::time::Instant,
    pub sequence: u32,
}

impl Frame {
    /// Average luma (0.0–255.0), BT.601 weights.
    pub fn avg_brightness(&self) -> f32 {
        let pixels = self.data.len() / 3;
        if pixels == 0 {
            return 0.0;
        }
        let sum: f32 = self
            .data
            .chunks_exact(3)
            .map(|p| 0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32)
            .sum();
        sum / pixels as f32
    }
}

/// Convert packed YUYV (4:2:2) to RGB8 using integer BT.601 limited-range math.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]; both pixels share U/V.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for chunk in yuyv[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&ycbcr_to_rgb(y0, u, v));
        rgb.extend_from_slice(&ycbcr_to_rgb(y1, u, v));
    }
    Ok(rgb)
}

fn ycbcr_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = (y as i32 - 16).max(0);
    let d = u as i32 - 128;
    let e = v as i32 - 128;

    let r = (298 * c + 409 * e + 128) >> 8;
    let g = (298 * c - 100 * d - 208 * e + 128) >> 8;
    let b = (298 * c + 516 * d + 128) >> 8;

    [clamp_u8(r), clamp_u8(g), clamp_u8(b)]
}

fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Swap packed BGR8 to RGB8 in place.
pub fn bgr_to_rgb_in_place(data: &mut [u8]) {
    for px in data.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_neutral_chroma_is_gray() {
        // 2x1: Y0=16 (black), Y1=235 (white), U=V=128
        let yuyv = vec![16, 128, 235, 128];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert_eq!(rgb, vec![0, 0, 0, 255, 255, 255]);
    }

    #[test]
    fn test_yuyv_mid_gray() {
        let yuyv = vec![126, 128, 126, 128];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert!(rgb.iter().all(|&c| c == rgb[0]));
        assert!((127..=129).contains(&rgb[0]), "got {}", rgb[0]);
    }

    #[test]
    fn test_yuyv_red_dominant() {
        // High V (Cr) pushes red up and green down.
        let yuyv = vec![81, 90, 81, 240];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert!(rgb[0] > 200, "red: {}", rgb[0]);
        assert!(rgb[1] < 50, "green: {}", rgb[1]);
        assert!(rgb[2] < 50, "blue: {}", rgb[2]);
    }

    #[test]
    fn test_yuyv_output_length() {
        let yuyv: Vec<u8> = vec![128; 4 * 2 * 2];
        let rgb = yuyv_to_rgb(&yuyv, 4, 2).unwrap();
        assert_eq!(rgb.len(), 4 * 2 * 3);
    }

    #[test]
    fn test_yuyv_invalid_length() {
        let yuyv = vec![100, 128];
        let result = yuyv_to_rgb(&yuyv, 2, 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_bgr_swap() {
        let mut data = vec![1, 2, 3, 4, 5, 6];
        bgr_to_rgb_in_place(&mut data);
        assert_eq!(data, vec![3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn test_avg_brightness() {
        let frame = Frame {
            data: vec![255; 12],
            width: 2,
            height: 2,
            timestamp: std::time::Instant::now(),
            sequence: 0,
        };
        assert!((frame.avg_brightness() - 255.0).abs() < 0.01);
    }
}
