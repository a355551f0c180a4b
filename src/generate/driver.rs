use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::Context as _;
use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::{
    foundation::error::{ReelError, ReelResult},
    generate::{
        model::{SamplingParams, TextToImage},
        plot::{figure_path_for, plot_images},
        upscale::Upscaler,
    },
    layout::grid::DEFAULT_MAX_COLUMNS,
    naming::names::{NameGenerator, OutputKey, OutputPlan},
};

/// Smallest accepted output edge, in pixels.
pub const MIN_DIMENSION: u32 = 128;

/// Parameters of one generation run.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    pub prompts: Vec<String>,
    pub batch_size: u32,
    pub steps: u32,
    /// Seed of the first batch item; each following item uses the next integer.
    pub seed: u64,
    pub guidance_scale: f32,
    pub upscale_factor: f32,
    pub export_intermediate_steps: bool,
    pub export_hop: u32,
    pub plot_output: bool,
    pub width: u32,
    pub height: u32,
}

impl GenerationRequest {
    pub fn validate(&self) -> ReelResult<()> {
        if self.prompts.is_empty() {
            return Err(ReelError::config("at least one prompt is required"));
        }
        if self.prompts.iter().any(|p| p.trim().is_empty()) {
            return Err(ReelError::config("prompts must be non-empty"));
        }
        if self.batch_size == 0 {
            return Err(ReelError::config("batch_size must be >= 1"));
        }
        if self.steps == 0 {
            return Err(ReelError::config("steps must be >= 1"));
        }
        if self.export_hop == 0 {
            return Err(ReelError::config("export_hop must be >= 1"));
        }
        if !self.upscale_factor.is_finite() || self.upscale_factor < 1.0 {
            return Err(ReelError::config(format!(
                "upscale must be a finite factor >= 1.0, got {}",
                self.upscale_factor
            )));
        }
        if !self.guidance_scale.is_finite() {
            return Err(ReelError::config("guidance must be finite"));
        }
        if self.width < MIN_DIMENSION || self.height < MIN_DIMENSION {
            return Err(ReelError::config(format!(
                "width/height must be >= {MIN_DIMENSION}, got {}x{}",
                self.width, self.height
            )));
        }
        if self.export_intermediate_steps {
            if self.export_hop >= self.steps {
                return Err(ReelError::config(format!(
                    "export_hop ({}) must be smaller than steps ({}) to export anything",
                    self.export_hop, self.steps
                )));
            }
            if !self.steps.is_multiple_of(self.export_hop) {
                return Err(ReelError::config(format!(
                    "export_hop ({}) must divide steps ({})",
                    self.export_hop, self.steps
                )));
            }
        }
        Ok(())
    }

    /// Raises width/height to [`MIN_DIMENSION`]. Returns true if anything changed.
    pub fn clamp_dimensions(&mut self) -> bool {
        let (w, h) = (self.width, self.height);
        self.width = w.max(MIN_DIMENSION);
        self.height = h.max(MIN_DIMENSION);
        if (w, h) != (self.width, self.height) {
            warn!(
                from = %format!("{w}x{h}"),
                to = %format!("{}x{}", self.width, self.height),
                "output size raised to the minimum"
            );
            return true;
        }
        false
    }

    /// Sampling step counts exported for every batch item.
    ///
    /// Intermediate exports cover `export_hop, 2 * export_hop, ..` strictly below `steps`;
    /// the full-length image is not produced in that mode.
    pub fn step_schedule(&self) -> Vec<u32> {
        if !self.export_intermediate_steps {
            return vec![self.steps];
        }
        if self.export_hop == 0 {
            return Vec::new();
        }
        (self.export_hop..self.steps)
            .step_by(self.export_hop as usize)
            .collect()
    }

    /// Number of model calls one run performs.
    pub fn image_count(&self) -> usize {
        self.prompts.len() * self.batch_size as usize * self.step_schedule().len()
    }

    fn output_plan(&self, names: &NameGenerator) -> ReelResult<OutputPlan> {
        let planned = if self.export_intermediate_steps {
            names.generate_with_steps(
                &self.prompts,
                self.batch_size,
                self.seed,
                self.steps,
                self.export_hop,
            )
        } else {
            let planned = names.generate(&self.prompts, self.batch_size, self.seed);
            let expected = self.prompts.len() * self.batch_size as usize;
            if planned.len() != expected {
                return Err(ReelError::naming_mismatch(expected, planned.len()));
            }
            planned
        };
        let plan: OutputPlan = planned.into_iter().collect();
        plan.ensure_covers(&self.output_keys())?;
        Ok(plan)
    }

    fn output_keys(&self) -> Vec<OutputKey> {
        let schedule = self.step_schedule();
        let mut keys = Vec::with_capacity(self.image_count());
        for prompt_index in 0..self.prompts.len() {
            for batch_index in 0..self.batch_size {
                for &steps in &schedule {
                    keys.push(self.key(prompt_index, batch_index, steps));
                }
            }
        }
        keys
    }

    fn key(&self, prompt_index: usize, batch_index: u32, steps: u32) -> OutputKey {
        OutputKey {
            prompt_index,
            batch_index,
            step: self.export_intermediate_steps.then_some(steps),
        }
    }
}

/// What a run wrote to disk.
#[derive(Clone, Debug, Default)]
pub struct GenerationReport {
    /// Image files in generation order.
    pub outputs: Vec<PathBuf>,
    pub figure: Option<PathBuf>,
    pub elapsed: Duration,
}

/// Runs every (prompt, batch item[, step]) of `request` through `model`.
///
/// Images are written to the paths planned by `names`, upscaled in place when
/// `upscale_factor != 1.0`, and the model session is reset after each batch item. With
/// `plot_output`, only the last produced image is plotted.
#[tracing::instrument(skip_all, fields(prompts = request.prompts.len(), batch_size = request.batch_size, steps = request.steps))]
pub fn run_generation(
    model: &mut dyn TextToImage,
    request: &GenerationRequest,
    names: &NameGenerator,
    upscaler: &dyn Upscaler,
) -> ReelResult<GenerationReport> {
    let started = Instant::now();
    request.validate()?;
    let plan = request.output_plan(names)?;
    ensure_dir(names.out_dir())?;

    let schedule = request.step_schedule();
    let mut report = GenerationReport::default();
    let mut last_image: Option<RgbaImage> = None;

    for (prompt_index, prompt) in request.prompts.iter().enumerate() {
        for batch_index in 0..request.batch_size {
            info!(batch = batch_index, prompt = %prompt, "creating batch item");
            for &steps in &schedule {
                let key = request.key(prompt_index, batch_index, steps);
                let name = plan
                    .get(&key)
                    .ok_or_else(|| ReelError::naming_mismatch(request.image_count(), plan.len()))?;

                let params = SamplingParams {
                    seed: name.seed,
                    num_steps: steps,
                    guidance_scale: request.guidance_scale,
                };
                debug!(seed = params.seed, steps, out = %name.path.display(), "generating image");
                let image = model.generate(prompt, &params)?;
                image
                    .save(&name.path)
                    .with_context(|| format!("write image '{}'", name.path.display()))?;

                if request.upscale_factor != 1.0 {
                    upscaler.upscale_in_place(&name.path, request.upscale_factor)?;
                }
                report.outputs.push(name.path.clone());
                last_image = Some(image);
            }
            model.reset_session()?;
        }
    }

    if request.plot_output
        && let (Some(image), Some(last_path)) = (last_image, report.outputs.last())
    {
        let figure = figure_path_for(last_path);
        plot_images(std::slice::from_ref(&image), &figure, DEFAULT_MAX_COLUMNS)?;
        report.figure = Some(figure);
    }

    report.elapsed = started.elapsed();
    info!(
        images = report.outputs.len(),
        elapsed_s = report.elapsed.as_secs_f64(),
        ?request,
        "generation run finished"
    );
    Ok(report)
}

fn ensure_dir(dir: &Path) -> ReelResult<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create output directory '{}'", dir.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/generate/driver.rs"]
mod tests;
