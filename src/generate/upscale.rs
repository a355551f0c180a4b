use std::path::Path;

use image::imageops::{self, FilterType};

use crate::{
    assets::decode::decode_frame,
    foundation::error::{ReelError, ReelResult},
};

/// Enlarges a saved image, rewriting the file in place.
pub trait Upscaler {
    fn upscale_in_place(&self, path: &Path, factor: f32) -> ReelResult<()>;
}

/// Resamples with a Lanczos3 kernel.
#[derive(Clone, Copy, Debug, Default)]
pub struct LanczosUpscaler;

impl Upscaler for LanczosUpscaler {
    fn upscale_in_place(&self, path: &Path, factor: f32) -> ReelResult<()> {
        if !factor.is_finite() || factor < 1.0 {
            return Err(ReelError::config(format!(
                "upscale factor must be >= 1.0, got {factor}"
            )));
        }
        let img = decode_frame(path)
            .map_err(|e| ReelError::model(format!("upscale '{}': {e}", path.display())))?;
        let (w, h) = scaled_dimensions(img.dimensions(), factor)?;
        let out = imageops::resize(&img, w, h, FilterType::Lanczos3);
        out.save(path).map_err(|e| {
            ReelError::model(format!("write upscaled image '{}': {e}", path.display()))
        })?;
        Ok(())
    }
}

/// `(round(w * factor), round(h * factor))`, never below the input size.
pub fn scaled_dimensions((w, h): (u32, u32), factor: f32) -> ReelResult<(u32, u32)> {
    let scale = |v: u32| -> ReelResult<u32> {
        let scaled = (f64::from(v) * f64::from(factor)).round();
        if scaled > f64::from(u32::MAX) {
            return Err(ReelError::model(format!(
                "upscaled size {scaled} exceeds the supported range"
            )));
        }
        Ok((scaled as u32).max(v))
    };
    Ok((scale(w)?, scale(h)?))
}

#[cfg(test)]
#[path = "../../tests/unit/generate/upscale.rs"]
mod tests;
