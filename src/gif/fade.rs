use image::RgbaImage;

use crate::assets::decode::{premultiply_rgba8_in_place, unpremultiply_rgba8_in_place};

pub type PremulRgba8 = [u8; 4];

/// Per-frame alpha of the white overlay: `alpha(i) = floor(255 / n) * i`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FadeRamp {
    alphas: Vec<u8>,
}

impl FadeRamp {
    pub fn new(frames: usize) -> Self {
        let step = 255usize.checked_div(frames).unwrap_or(0);
        let alphas = (0..frames)
            .map(|i| (step * i).min(255) as u8)
            .collect();
        Self { alphas }
    }

    pub fn len(&self) -> usize {
        self.alphas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alphas.is_empty()
    }

    pub fn alpha(&self, idx: usize) -> Option<u8> {
        self.alphas.get(idx).copied()
    }

    pub fn alphas(&self) -> &[u8] {
        &self.alphas
    }
}

/// Porter-Duff source-over on premultiplied pixels.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if src[3] == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(src[3]);

    let mut out = [0u8; 4];
    for i in 0..4 {
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = src[i].saturating_add(dc);
    }
    out
}

/// Composite solid white at `alpha` over `frame`.
pub fn overlay_white_in_place(frame: &mut RgbaImage, alpha: u8) {
    if alpha == 0 {
        return;
    }
    let white = [alpha; 4];
    let buf: &mut [u8] = &mut **frame;
    premultiply_rgba8_in_place(buf);
    for px in buf.chunks_exact_mut(4) {
        let out = over([px[0], px[1], px[2], px[3]], white);
        px.copy_from_slice(&out);
    }
    unpremultiply_rgba8_in_place(buf);
}

/// Applies the ramp for `frames.len()` frames, frame `i` getting `alpha(i)`.
pub fn apply_fade(frames: &mut [RgbaImage]) {
    let ramp = FadeRamp::new(frames.len());
    for (frame, &alpha) in frames.iter_mut().zip(ramp.alphas()) {
        overlay_white_in_place(frame, alpha);
    }
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/gif/fade.rs"]
mod tests;
