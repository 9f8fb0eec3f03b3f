//! Readback normalization: whatever the backend hands out becomes top-down RGBA.

use crate::render::{ChannelOrder, GpuError, RawPixels, RowOrder};

use super::PixelBuffer;

/// Converts raw framebuffer contents into a top-down RGBA image.
///
/// Swaps red and blue for BGRA readbacks and flips rows for bottom-up ones.
pub fn normalize(raw: RawPixels) -> Result<PixelBuffer, GpuError> {
    let RawPixels { width, height, mut data, row_order, channel_order } = raw;

    let row = width as usize * 4;
    let expected = row * height as usize;
    if data.len() != expected {
        return Err(GpuError::Readback(format!(
            "expected {expected} bytes for {width}x{height}, got {}",
            data.len()
        )));
    }

    if channel_order == ChannelOrder::Bgra {
        for px in data.chunks_exact_mut(4) {
            px.swap(0, 2);
        }
    }

    if row_order == RowOrder::BottomUp && row > 0 {
        let rows = height as usize;
        for y in 0..rows / 2 {
            let (top, bottom) = data.split_at_mut((rows - 1 - y) * row);
            top[y * row..(y + 1) * row].swap_with_slice(&mut bottom[..row]);
        }
    }

    PixelBuffer::from_raw(width, height, data)
        .ok_or_else(|| GpuError::Readback("pixel buffer size mismatch".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(width: u32, height: u32, data: Vec<u8>, rows: RowOrder, channels: ChannelOrder) -> RawPixels {
        RawPixels { width, height, data, row_order: rows, channel_order: channels }
    }

    #[test]
    fn bgra_is_swapped_to_rgba() {
        let img = normalize(raw(1, 1, vec![10, 20, 30, 40], RowOrder::TopDown, ChannelOrder::Bgra)).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [30, 20, 10, 40]);
    }

    #[test]
    fn bottom_up_rows_are_flipped() {
        #[rustfmt::skip]
        let data = vec![
            1, 1, 1, 1,
            2, 2, 2, 2,
            3, 3, 3, 3,
        ];
        let img = normalize(raw(1, 3, data, RowOrder::BottomUp, ChannelOrder::Rgba)).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [3; 4]);
        assert_eq!(img.get_pixel(0, 1).0, [2; 4]);
        assert_eq!(img.get_pixel(0, 2).0, [1; 4]);
    }

    #[test]
    fn top_down_rgba_is_untouched() {
        let data: Vec<u8> = (0..16).collect();
        let img = normalize(raw(2, 2, data.clone(), RowOrder::TopDown, ChannelOrder::Rgba)).unwrap();
        assert_eq!(img.into_raw(), data);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let err = normalize(raw(2, 2, vec![0; 15], RowOrder::TopDown, ChannelOrder::Rgba)).unwrap_err();
        assert!(matches!(err, GpuError::Readback(_)));
    }

    #[test]
    fn zero_sized_capture_is_empty() {
        let img = normalize(raw(0, 0, Vec::new(), RowOrder::BottomUp, ChannelOrder::Bgra)).unwrap();
        assert_eq!(img.dimensions(), (0, 0));
    }
}
