use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use image::{
    Delay, Frame, RgbaImage,
    codecs::gif::{GifEncoder, Repeat},
};
use tracing::{debug, info};

use crate::{
    assets::decode::decode_frame,
    foundation::error::{ReelError, ReelResult},
    gif::fade::apply_fade,
};

/// macOS Finder metadata, never a frame.
pub const OS_METADATA_FILE: &str = ".DS_Store";

/// Extensions accepted as frames when fading.
pub const FADE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

const OUTPUT_STEM: &str = "animation";

// GIF frame delays are stored in centiseconds.
const DELAY_UNIT_MS: u32 = 10;

// GIF encoder speed (1 = best quality, 30 = fastest).
const ENCODE_SPEED: i32 = 10;

/// Stitches the stills of a folder into one looping animated GIF.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GifAssembler {
    frame_delay_ms: u32,
    fade: bool,
}

impl GifAssembler {
    /// `frame_delay_ms` must be a whole number of centiseconds, the unit GIF stores.
    pub fn new(frame_delay_ms: u32, fade: bool) -> ReelResult<Self> {
        if frame_delay_ms < DELAY_UNIT_MS || !frame_delay_ms.is_multiple_of(DELAY_UNIT_MS) {
            return Err(ReelError::config(format!(
                "frame delay must be a positive multiple of {DELAY_UNIT_MS}ms, got {frame_delay_ms}ms"
            )));
        }
        Ok(Self {
            frame_delay_ms,
            fade,
        })
    }

    /// Delay given in (fractional) seconds, rounded to whole centiseconds.
    pub fn from_seconds(frame_delay_seconds: f64, fade: bool) -> ReelResult<Self> {
        if !frame_delay_seconds.is_finite() || frame_delay_seconds <= 0.0 {
            return Err(ReelError::config(format!(
                "frame delay must be a positive number of seconds, got {frame_delay_seconds}"
            )));
        }
        let units = (frame_delay_seconds * 1000.0 / f64::from(DELAY_UNIT_MS)).round();
        if units < 1.0 {
            return Err(ReelError::config(format!(
                "frame delay must be at least {DELAY_UNIT_MS}ms, got {frame_delay_seconds}s"
            )));
        }
        if units * f64::from(DELAY_UNIT_MS) > f64::from(u32::MAX) {
            return Err(ReelError::config("frame delay is too large"));
        }
        Self::new(units as u32 * DELAY_UNIT_MS, fade)
    }

    pub fn frame_delay_ms(&self) -> u32 {
        self.frame_delay_ms
    }

    pub fn fade(&self) -> bool {
        self.fade
    }

    /// File name of the animation written into the input folder.
    pub fn output_file_name(&self) -> String {
        if self.fade {
            format!("{OUTPUT_STEM}_{}ms_fade.gif", self.frame_delay_ms)
        } else {
            format!("{OUTPUT_STEM}_{}ms.gif", self.frame_delay_ms)
        }
    }

    pub fn output_path(&self, folder: &Path) -> PathBuf {
        folder.join(self.output_file_name())
    }

    /// Frame files of `folder` in lexicographic name order.
    pub fn list_frames(&self, folder: &Path) -> ReelResult<Vec<PathBuf>> {
        let entries = std::fs::read_dir(folder).map_err(|e| {
            ReelError::empty_input(format!(
                "cannot read frame folder '{}': {e}",
                folder.display()
            ))
        })?;

        let mut frames = Vec::new();
        for entry in entries {
            let entry = entry
                .with_context(|| format!("list frame folder '{}'", folder.display()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name == OS_METADATA_FILE || is_previous_output(&name) {
                continue;
            }
            if self.fade && !has_fade_extension(&path) {
                debug!(path = %path.display(), "skipping non-raster file");
                continue;
            }
            frames.push(path);
        }
        frames.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(frames)
    }

    /// Decodes every frame of `folder`, fading them towards white if enabled.
    pub fn load_frames(&self, folder: &Path) -> ReelResult<Vec<RgbaImage>> {
        let paths = self.list_frames(folder)?;
        if paths.is_empty() {
            return Err(ReelError::empty_input(format!(
                "no frames found in '{}'",
                folder.display()
            )));
        }

        let mut frames = paths
            .iter()
            .map(|p| decode_frame(p))
            .collect::<ReelResult<Vec<_>>>()?;
        if self.fade {
            apply_fade(&mut frames);
        }
        Ok(frames)
    }

    /// Writes `<folder>/animation_<delay>ms[_fade].gif` and returns its path.
    #[tracing::instrument(skip(self), fields(delay_ms = self.frame_delay_ms, fade = self.fade))]
    pub fn assemble(&self, folder: &Path) -> ReelResult<PathBuf> {
        let frames = self.load_frames(folder)?;
        let out_path = self.output_path(folder);
        let count = frames.len();
        write_gif(&out_path, frames, self.frame_delay_ms)?;
        info!(frames = count, out = %out_path.display(), "wrote animation");
        Ok(out_path)
    }
}

/// One-shot form of [`GifAssembler::assemble`].
pub fn assemble_gif(folder: &Path, frame_delay_seconds: f64, fade: bool) -> ReelResult<PathBuf> {
    GifAssembler::from_seconds(frame_delay_seconds, fade)?.assemble(folder)
}

/// Encodes `frames` in order as an infinitely looping GIF.
pub fn write_gif(out_path: &Path, frames: Vec<RgbaImage>, frame_delay_ms: u32) -> ReelResult<()> {
    if frames.is_empty() {
        return Err(ReelError::empty_input("cannot write a GIF without frames"));
    }

    let file = File::create(out_path)
        .with_context(|| format!("create gif '{}'", out_path.display()))?;
    let mut encoder = GifEncoder::new_with_speed(BufWriter::new(file), ENCODE_SPEED);
    encoder
        .set_repeat(Repeat::Infinite)
        .context("set gif loop count")?;

    let delay = Delay::from_numer_denom_ms(frame_delay_ms, 1);
    for (idx, img) in frames.into_iter().enumerate() {
        encoder
            .encode_frame(Frame::from_parts(img, 0, 0, delay))
            .with_context(|| format!("encode gif frame {idx}"))?;
    }
    Ok(())
}

fn has_fade_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            FADE_EXTENSIONS
                .iter()
                .any(|ok| e.eq_ignore_ascii_case(ok))
        })
}

/// Matches `animation_<n>ms.gif` and `animation_<n>ms_fade.gif` exactly.
fn is_previous_output(name: &str) -> bool {
    let Some(rest) = name
        .strip_prefix(OUTPUT_STEM)
        .and_then(|r| r.strip_prefix('_'))
        .and_then(|r| r.strip_suffix(".gif"))
    else {
        return false;
    };
    let rest = rest.strip_suffix("_fade").unwrap_or(rest);
    rest.strip_suffix("ms")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
#[path = "../../tests/unit/gif/assemble.rs"]
mod tests;
