//! RGB frame to ASCII rasterization.
//!
//! Sampling is nearest-neighbor with clamped coordinates, so any frame size
//! maps onto any viewport without interpolation buffers. Brightness is the
//! unweighted mean of the three channels.

/// Glyphs ordered darkest to brightest.
pub const ASCII_RAMP: &[u8] = b" .:-=+*#%@";

/// Map a brightness value onto the ramp. 0 and 255 hit the ramp's first and
/// last glyph exactly; everything else scales linearly between them.
pub fn glyph_for(brightness: u8) -> char {
    let index = brightness as usize * (ASCII_RAMP.len() - 1) / 255;
    ASCII_RAMP[index] as char
}

/// Rasterize a packed RGB24 frame into `rows` strings of `cols` glyphs.
///
/// `stride` is the frame's row pitch in bytes, which may exceed
/// `frame_w * 3` when the decoder pads rows. A zero-sized viewport yields
/// no lines.
pub fn frame_to_lines(
    data: &[u8],
    stride: usize,
    frame_w: usize,
    frame_h: usize,
    cols: usize,
    rows: usize,
) -> Vec<String> {
    if frame_w == 0 || frame_h == 0 {
        return Vec::new();
    }

    let mut lines = Vec::with_capacity(rows);
    for cy in 0..rows {
        let fy = (cy * frame_h / rows).min(frame_h - 1);
        let mut line = String::with_capacity(cols);
        for cx in 0..cols {
            let fx = (cx * frame_w / cols).min(frame_w - 1);
            let p = fy * stride + fx * 3;
            let sum = data[p] as u16 + data[p + 1] as u16 + data[p + 2] as u16;
            line.push(glyph_for((sum / 3) as u8));
        }
        lines.push(line);
    }
    lines
}
