use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, ErrorKind},
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::Context as _;
use image::RgbaImage;
use tracing::{debug, warn};

use crate::{
    assets::decode::decode_frame,
    foundation::error::{ReelError, ReelResult},
};

/// Sampling parameters for a single text-to-image call (batch of one).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplingParams {
    pub seed: u64,
    pub num_steps: u32,
    pub guidance_scale: f32,
}

/// A pretrained text-to-image model built for a fixed output size.
pub trait TextToImage {
    /// `(width, height)` the model was built for.
    fn dimensions(&self) -> (u32, u32);

    fn generate(&mut self, prompt: &str, params: &SamplingParams) -> ReelResult<RgbaImage>;

    /// Drops per-call session state. Called after every finished batch item.
    fn reset_session(&mut self) -> ReelResult<()> {
        Ok(())
    }
}

/// External generator invocation, read from JSON:
///
/// ```json
/// { "program": "sd", "args": ["-p", "{prompt}", "--seed", "{seed}", "-o", "{out}"] }
/// ```
///
/// Placeholders: `{prompt}`, `{seed}`, `{steps}`, `{guidance}`, `{width}`, `{height}`, `{out}`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ModelCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl ModelCommand {
    pub fn from_path(path: &Path) -> ReelResult<Self> {
        let f = File::open(path)
            .with_context(|| format!("open model config '{}'", path.display()))?;
        let cmd: Self = serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            ReelError::config(format!("parse model config '{}': {e}", path.display()))
        })?;
        cmd.validate()?;
        Ok(cmd)
    }

    pub fn validate(&self) -> ReelResult<()> {
        if self.program.trim().is_empty() {
            return Err(ReelError::config("model command program must be non-empty"));
        }
        if !self.args.iter().any(|a| a.contains("{out}")) {
            return Err(ReelError::config(
                "model command args must contain an {out} placeholder",
            ));
        }
        Ok(())
    }

    /// Arguments with every placeholder substituted.
    pub fn render_args(
        &self,
        prompt: &str,
        params: &SamplingParams,
        (width, height): (u32, u32),
        out: &Path,
    ) -> Vec<String> {
        let out = out.to_string_lossy();
        self.args
            .iter()
            .map(|a| {
                // Prompt last so prompt text is never scanned for placeholders.
                a.replace("{seed}", &params.seed.to_string())
                    .replace("{steps}", &params.num_steps.to_string())
                    .replace("{guidance}", &params.guidance_scale.to_string())
                    .replace("{width}", &width.to_string())
                    .replace("{height}", &height.to_string())
                    .replace("{out}", &out)
                    .replace("{prompt}", prompt)
            })
            .collect()
    }
}

/// Runs an external text-to-image program once per image and reads back the PNG it wrote.
pub struct CommandModel {
    cmd: ModelCommand,
    width: u32,
    height: u32,
    scratch_dir: PathBuf,
    calls: u64,
}

impl CommandModel {
    pub fn new(
        cmd: ModelCommand,
        width: u32,
        height: u32,
        scratch_dir: impl Into<PathBuf>,
    ) -> ReelResult<Self> {
        cmd.validate()?;
        if width == 0 || height == 0 {
            return Err(ReelError::config("model width/height must be non-zero"));
        }
        let scratch_dir = scratch_dir.into();
        std::fs::create_dir_all(&scratch_dir).with_context(|| {
            format!("create model scratch dir '{}'", scratch_dir.display())
        })?;
        Ok(Self {
            cmd,
            width,
            height,
            scratch_dir,
            calls: 0,
        })
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }
}

impl TextToImage for CommandModel {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn generate(&mut self, prompt: &str, params: &SamplingParams) -> ReelResult<RgbaImage> {
        let out = self
            .scratch_dir
            .join(format!("sample_{:06}.png", self.calls));
        self.calls += 1;
        if let Err(e) = std::fs::remove_file(&out)
            && e.kind() != ErrorKind::NotFound
        {
            return Err(anyhow::Error::new(e)
                .context(format!("remove stale model output '{}'", out.display()))
                .into());
        }

        let args = self.cmd.render_args(prompt, params, self.dimensions(), &out);
        debug!(program = %self.cmd.program, ?args, "invoking model");

        let output = Command::new(&self.cmd.program)
            .args(&args)
            .envs(&self.cmd.env)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                ReelError::model(format!("failed to spawn '{}': {e}", self.cmd.program))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReelError::model(format!(
                "'{}' exited with {}: {}",
                self.cmd.program,
                output.status,
                stderr.trim()
            )));
        }
        if !out.is_file() {
            return Err(ReelError::model(format!(
                "'{}' did not write '{}'",
                self.cmd.program,
                out.display()
            )));
        }

        let img = decode_frame(&out)
            .map_err(|e| ReelError::model(format!("unreadable model output: {e}")))?;
        if img.dimensions() != self.dimensions() {
            warn!(
                got = ?img.dimensions(),
                expected = ?self.dimensions(),
                "model output size differs from requested size"
            );
        }
        Ok(img)
    }

    fn reset_session(&mut self) -> ReelResult<()> {
        let entries = std::fs::read_dir(&self.scratch_dir).with_context(|| {
            format!("list model scratch dir '{}'", self.scratch_dir.display())
        })?;
        for entry in entries {
            let path = entry.context("read model scratch dir entry")?.path();
            if path.is_file() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("remove scratch file '{}'", path.display()))?;
            }
        }
        self.calls = 0;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/generate/model.rs"]
mod tests;
