use std::{
    collections::{BTreeMap, HashSet},
    path::{Path, PathBuf},
};

use crate::foundation::error::{ReelError, ReelResult};

/// Prompt budget (in chars) for names without a step suffix.
pub const PROMPT_BUDGET: usize = 40;
/// Prompt budget (in chars) for names carrying a step suffix.
pub const STEPPED_PROMPT_BUDGET: usize = 60;

const TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_";

/// Identifies one image the driver is going to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutputKey {
    pub prompt_index: usize,
    pub batch_index: u32,
    /// Sampling step count the image was exported at, for intermediate exports.
    pub step: Option<u32>,
}

/// A planned output file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputName {
    pub key: OutputKey,
    pub seed: u64,
    pub path: PathBuf,
}

/// Derives deterministic output paths from a run's parameters.
///
/// Every name shares an hour-granularity timestamp prefix captured when the generator is
/// created, so all names of one run sort together.
#[derive(Clone, Debug)]
pub struct NameGenerator {
    out_dir: PathBuf,
    timestamp: String,
}

impl NameGenerator {
    /// Names rooted at `out_dir`, stamped with the current local hour.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        Self::with_timestamp(out_dir, timestamp)
    }

    /// Names with a fixed timestamp prefix (e.g. `2024_05_01_13_`).
    pub fn with_timestamp(out_dir: impl Into<PathBuf>, timestamp: impl Into<String>) -> Self {
        Self {
            out_dir: out_dir.into(),
            timestamp: timestamp.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// One name per (prompt, batch index), prompts outer, batch inner.
    ///
    /// File names record the run's base `seed`; batch item `b` of prompt `p` is generated
    /// with `seed + p * batch_size + b`, kept in [`OutputName::seed`].
    pub fn generate(&self, prompts: &[String], batch_size: u32, seed: u64) -> Vec<OutputName> {
        let mut names = Vec::with_capacity(prompts.len() * batch_size as usize);
        for (prompt_index, stem) in unique_stems(prompts, PROMPT_BUDGET).iter().enumerate() {
            for batch in 0..batch_size {
                let file = format!(
                    "{}{}_s{}_b{}.png",
                    self.timestamp,
                    stem,
                    seed,
                    pad_index(u64::from(batch), u64::from(batch_size)),
                );
                names.push(OutputName {
                    key: OutputKey {
                        prompt_index,
                        batch_index: batch,
                        step: None,
                    },
                    seed: item_seed(seed, prompt_index, batch_size, batch),
                    path: self.out_dir.join(file),
                });
            }
        }
        names
    }

    /// Like [`NameGenerator::generate`], with an innermost loop over
    /// `step in 0..steps / step_hop` naming the checkpoint `step * step_hop`.
    pub fn generate_with_steps(
        &self,
        prompts: &[String],
        batch_size: u32,
        seed: u64,
        steps: u32,
        step_hop: u32,
    ) -> Vec<OutputName> {
        let checkpoints = steps.checked_div(step_hop).unwrap_or(0);
        let mut names =
            Vec::with_capacity(prompts.len() * batch_size as usize * checkpoints as usize);
        for (prompt_index, stem) in unique_stems(prompts, STEPPED_PROMPT_BUDGET)
            .iter()
            .enumerate()
        {
            for batch in 0..batch_size {
                let item_seed = item_seed(seed, prompt_index, batch_size, batch);
                for idx in 0..checkpoints {
                    let step = idx * step_hop;
                    let file = format!(
                        "{}{}_s{}_{}_step{}.png",
                        self.timestamp,
                        stem,
                        seed,
                        pad_index(u64::from(batch), u64::from(batch_size)),
                        pad_index(u64::from(step), u64::from(steps)),
                    );
                    names.push(OutputName {
                        key: OutputKey {
                            prompt_index,
                            batch_index: batch,
                            step: Some(step),
                        },
                        seed: item_seed,
                        path: self.out_dir.join(file),
                    });
                }
            }
        }
        names
    }
}

/// Output names handed to the generation driver, looked up by what is being produced
/// rather than by a running index.
#[derive(Clone, Debug, Default)]
pub struct OutputPlan {
    by_key: BTreeMap<OutputKey, OutputName>,
}

impl OutputPlan {
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn get(&self, key: &OutputKey) -> Option<&OutputName> {
        self.by_key.get(key)
    }

    /// Fails with [`ReelError::NamingMismatch`] unless every key in `required` has a name.
    pub fn ensure_covers<'a>(
        &self,
        required: impl IntoIterator<Item = &'a OutputKey>,
    ) -> ReelResult<()> {
        let mut expected = 0usize;
        let mut covered = 0usize;
        for key in required {
            expected += 1;
            if self.by_key.contains_key(key) {
                covered += 1;
            }
        }
        if covered != expected {
            return Err(ReelError::naming_mismatch(expected, covered));
        }
        Ok(())
    }
}

impl FromIterator<OutputName> for OutputPlan {
    fn from_iter<I: IntoIterator<Item = OutputName>>(iter: I) -> Self {
        Self {
            by_key: iter.into_iter().map(|n| (n.key, n)).collect(),
        }
    }
}

/// Seed used for batch item `batch` of prompt `prompt_index`.
pub fn item_seed(base: u64, prompt_index: usize, batch_size: u32, batch: u32) -> u64 {
    base.wrapping_add(prompt_index as u64 * u64::from(batch_size))
        .wrapping_add(u64::from(batch))
}

/// Replaces spaces and path separators with `_` and keeps at most `budget` chars.
pub fn sanitize_prompt(prompt: &str, budget: usize) -> String {
    prompt
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .take(budget)
        .collect()
}

/// Sanitized prompt prefixes, suffixed with `_p<index>` where a prefix would repeat.
fn unique_stems(prompts: &[String], budget: usize) -> Vec<String> {
    let mut used = HashSet::with_capacity(prompts.len());
    let mut stems = Vec::with_capacity(prompts.len());
    for (idx, prompt) in prompts.iter().enumerate() {
        let mut stem = sanitize_prompt(prompt, budget);
        while used.contains(&stem) {
            stem = format!("{stem}_p{idx}");
        }
        used.insert(stem.clone());
        stems.push(stem);
    }
    stems
}

/// Zero-pads `idx` to the decimal width of `max`.
pub fn pad_index(idx: u64, max: u64) -> String {
    let width = max.to_string().len();
    format!("{idx:0width$}")
}

#[cfg(test)]
#[path = "../../tests/unit/naming/names.rs"]
mod tests;
