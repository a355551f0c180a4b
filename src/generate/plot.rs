use std::path::{Path, PathBuf};

use anyhow::Context as _;
use image::{Rgba, RgbaImage, imageops};

use crate::{
    foundation::error::{ReelError, ReelResult},
    layout::grid::{GridShape, compute_grid},
};

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// `<dir>/<stem>_figure.png` next to `image_path`.
pub fn figure_path_for(image_path: &Path) -> PathBuf {
    let stem = image_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "plot".to_string());
    image_path.with_file_name(format!("{stem}_figure.png"))
}

/// Tiles `images` row by row on a white sheet; every cell is as large as the largest image.
pub fn contact_sheet(images: &[RgbaImage], max_columns: u32) -> ReelResult<(RgbaImage, GridShape)> {
    if images.is_empty() {
        return Err(ReelError::empty_input("nothing to plot"));
    }
    let count = u32::try_from(images.len())
        .map_err(|_| ReelError::config("too many images to plot"))?;
    let grid = compute_grid(count, max_columns);

    let cell_w = images.iter().map(|i| i.width()).max().unwrap_or(0);
    let cell_h = images.iter().map(|i| i.height()).max().unwrap_or(0);
    let sheet_w = cell_w
        .checked_mul(grid.columns)
        .ok_or_else(|| ReelError::config("contact sheet too wide"))?;
    let sheet_h = cell_h
        .checked_mul(grid.rows)
        .ok_or_else(|| ReelError::config("contact sheet too tall"))?;

    let mut sheet = RgbaImage::from_pixel(sheet_w, sheet_h, BACKGROUND);
    for (idx, img) in (0u32..).zip(images) {
        let (row, col) = grid.position(idx);
        imageops::overlay(
            &mut sheet,
            img,
            i64::from(col * cell_w),
            i64::from(row * cell_h),
        );
    }
    Ok((sheet, grid))
}

/// Renders `images` as one contact sheet PNG at `out_path`.
pub fn plot_images(images: &[RgbaImage], out_path: &Path, max_columns: u32) -> ReelResult<GridShape> {
    let (sheet, grid) = contact_sheet(images, max_columns)?;
    tracing::info!(
        images = images.len(),
        rows = grid.rows,
        columns = grid.columns,
        out = %out_path.display(),
        "plotting images"
    );
    sheet
        .save(out_path)
        .with_context(|| format!("write plot '{}'", out_path.display()))?;
    Ok(grid)
}

#[cfg(test)]
#[path = "../../tests/unit/generate/plot.rs"]
mod tests;
