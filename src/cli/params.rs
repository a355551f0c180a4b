use std::io::{BufRead, Write};

use anyhow::Context as _;

use crate::{
    foundation::error::{ReelError, ReelResult},
    generate::driver::GenerationRequest,
};

/// Defaults shared by the command line and the interactive editor.
pub mod defaults {
    pub const WIDTH: u32 = 512;
    pub const HEIGHT: u32 = 512;
    pub const PROMPT: &str = "Fantasy painting of a happy black cat floating on clouds of love";
    pub const BATCH_SIZE: u32 = 1;
    pub const STEPS: u32 = 50;
    pub const PLOT_OUTPUT: bool = false;
    pub const UPSCALE: f32 = 1.0;
    pub const EXPORT_STEPS: bool = false;
    pub const EXPORT_HOP: u32 = 5;
    pub const GUIDANCE: f32 = 9.0;
    /// Exclusive upper bound for randomly drawn seeds.
    pub const SEED_RANGE: u64 = 100_000;
}

/// Separator between prompts typed on one interactive line.
pub const PROMPT_SEPARATOR: char = ';';

pub fn random_seed() -> u64 {
    rand::random_range(0..defaults::SEED_RANGE)
}

/// Strict boolean parsing: `y/yes/true/1` and `n/no/false/0`, case-insensitive.
pub fn parse_bool(s: &str) -> ReelResult<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "1" => Ok(true),
        "n" | "no" | "false" | "0" => Ok(false),
        other => Err(ReelError::config(format!(
            "expected a boolean (y/yes/true/1 or n/no/false/0), got '{other}'"
        ))),
    }
}

fn parse_positive(name: &str, s: &str) -> ReelResult<u32> {
    let v: u32 = s
        .trim()
        .parse()
        .map_err(|e| ReelError::config(format!("{name}: expected a positive integer: {e}")))?;
    if v == 0 {
        return Err(ReelError::config(format!("{name} must be >= 1")));
    }
    Ok(v)
}

fn parse_float(name: &str, s: &str) -> ReelResult<f32> {
    let v: f32 = s
        .trim()
        .parse()
        .map_err(|e| ReelError::config(format!("{name}: expected a number: {e}")))?;
    if !v.is_finite() {
        return Err(ReelError::config(format!("{name} must be finite")));
    }
    Ok(v)
}

/// Splits `a; b ;c` into trimmed, non-empty prompts.
pub fn parse_prompts(s: &str) -> ReelResult<Vec<String>> {
    let prompts: Vec<String> = s
        .split(PROMPT_SEPARATOR)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    if prompts.is_empty() {
        return Err(ReelError::config("at least one prompt is required"));
    }
    Ok(prompts)
}

/// One editable field of a [`GenerationRequest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Param {
    Width,
    Height,
    Prompts,
    BatchSize,
    Steps,
    PlotOutput,
    Seed,
    Upscale,
    ExportSteps,
    ExportHop,
    Guidance,
}

impl Param {
    /// Fields in the order the editor walks them.
    pub const ALL: [Param; 11] = [
        Param::Width,
        Param::Height,
        Param::Prompts,
        Param::BatchSize,
        Param::Steps,
        Param::PlotOutput,
        Param::Seed,
        Param::Upscale,
        Param::ExportSteps,
        Param::ExportHop,
        Param::Guidance,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Param::Width => "width",
            Param::Height => "height",
            Param::Prompts => "prompts",
            Param::BatchSize => "batch_size",
            Param::Steps => "steps",
            Param::PlotOutput => "plot_output",
            Param::Seed => "seed",
            Param::Upscale => "upscale",
            Param::ExportSteps => "export_steps",
            Param::ExportHop => "export_hop",
            Param::Guidance => "guidance",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            Param::Width => "output width of generated image in pixels (min 128)",
            Param::Height => "output height of generated image in pixels (min 128)",
            Param::Prompts => "prompts to generate images from, separated by ';'",
            Param::BatchSize => "how many images to generate per prompt",
            Param::Steps => "number of diffusion sampling steps",
            Param::PlotOutput => "plot the last generated image to a _figure.png (y/n)",
            Param::Seed => "seed of the first image; later images use the following seeds",
            Param::Upscale => "factor to upscale generated images by (1.0 = off)",
            Param::ExportSteps => "export intermediate steps every export_hop steps (y/n)",
            Param::ExportHop => "step interval for intermediate exports",
            Param::Guidance => "how closely to follow the prompt (5.0 - 15.0 work best)",
        }
    }

    /// Current value as shown to the user.
    pub fn current(self, req: &GenerationRequest) -> String {
        match self {
            Param::Width => req.width.to_string(),
            Param::Height => req.height.to_string(),
            Param::Prompts => req.prompts.join("; "),
            Param::BatchSize => req.batch_size.to_string(),
            Param::Steps => req.steps.to_string(),
            Param::PlotOutput => req.plot_output.to_string(),
            Param::Seed => req.seed.to_string(),
            Param::Upscale => req.upscale_factor.to_string(),
            Param::ExportSteps => req.export_intermediate_steps.to_string(),
            Param::ExportHop => req.export_hop.to_string(),
            Param::Guidance => req.guidance_scale.to_string(),
        }
    }

    /// Parses `input` for this field and stores it; `req` is untouched on error.
    pub fn apply(self, req: &mut GenerationRequest, input: &str) -> ReelResult<()> {
        let name = self.name();
        match self {
            Param::Width => req.width = parse_positive(name, input)?,
            Param::Height => req.height = parse_positive(name, input)?,
            Param::Prompts => req.prompts = parse_prompts(input)?,
            Param::BatchSize => req.batch_size = parse_positive(name, input)?,
            Param::Steps => req.steps = parse_positive(name, input)?,
            Param::PlotOutput => req.plot_output = parse_bool(input)?,
            Param::Seed => {
                req.seed = input.trim().parse().map_err(|e| {
                    ReelError::config(format!("seed: expected a non-negative integer: {e}"))
                })?
            }
            Param::Upscale => {
                let v = parse_float(name, input)?;
                if v < 1.0 {
                    return Err(ReelError::config("upscale must be >= 1.0"));
                }
                req.upscale_factor = v;
            }
            Param::ExportSteps => req.export_intermediate_steps = parse_bool(input)?,
            Param::ExportHop => req.export_hop = parse_positive(name, input)?,
            Param::Guidance => req.guidance_scale = parse_float(name, input)?,
        }
        Ok(())
    }
}

pub fn help_text() -> String {
    let mut out = String::from("parameters:\n");
    for p in Param::ALL {
        out.push_str(&format!("  {:<14} {}\n", p.name(), p.help()));
    }
    out
}

const RULE: &str = "------------------------------------------------------------";

/// Walks every [`Param`], showing its value: blank keeps it, `h` prints help, anything else
/// is parsed into the field (re-asking on invalid input).
///
/// Repeats the walk while the edited request fails validation. At end of input the
/// remaining fields keep their values.
pub fn edit_interactively<R: BufRead, W: Write>(
    req: &mut GenerationRequest,
    input: &mut R,
    out: &mut W,
) -> ReelResult<()> {
    writeln!(out, "{RULE}").context("write prompt")?;
    writeln!(out, "Press enter to keep the prior value, or type \"h\" for descriptions.")
        .context("write prompt")?;

    let mut eof = false;
    loop {
        for param in Param::ALL {
            if eof {
                break;
            }
            writeln!(out, "{RULE}").context("write prompt")?;
            loop {
                write!(
                    out,
                    "For \"{}\" the prior value was \"{}\", new value: ",
                    param.name(),
                    param.current(req)
                )
                .context("write prompt")?;
                out.flush().context("flush prompt")?;

                let Some(line) = read_line(input)? else {
                    eof = true;
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    writeln!(out, "Keeping \"{}\" = \"{}\"", param.name(), param.current(req))
                        .context("write prompt")?;
                    break;
                }
                if line.eq_ignore_ascii_case("h") {
                    write!(out, "{}", help_text()).context("write help")?;
                    continue;
                }
                match param.apply(req, line) {
                    Ok(()) => {
                        writeln!(out, "Changed \"{}\" to \"{}\"", param.name(), param.current(req))
                            .context("write prompt")?;
                        break;
                    }
                    Err(e) => writeln!(out, "{e}").context("write prompt")?,
                }
            }
        }

        req.clamp_dimensions();
        match req.validate() {
            Ok(()) => break,
            Err(e) if eof => return Err(e),
            Err(e) => writeln!(out, "{e}; please adjust the parameters").context("write prompt")?,
        }
    }

    writeln!(out, "{RULE}").context("write prompt")?;
    Ok(())
}

/// Asks "run again? (y/n)" until the answer is `y` or `n`. End of input counts as `n`.
pub fn ask_run_again<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> ReelResult<bool> {
    loop {
        write!(out, "Would you like to run the program again? (y/n): ").context("write prompt")?;
        out.flush().context("flush prompt")?;
        let Some(line) = read_line(input)? else {
            return Ok(false);
        };
        match line.trim().to_ascii_lowercase().as_str() {
            "y" => return Ok(true),
            "n" => return Ok(false),
            _ => writeln!(out, "Invalid input. Please enter 'y' or 'n'.").context("write prompt")?,
        }
    }
}

fn read_line<R: BufRead>(input: &mut R) -> ReelResult<Option<String>> {
    let mut line = String::new();
    let n = input.read_line(&mut line).context("read stdin")?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

#[cfg(test)]
#[path = "../../tests/unit/cli/params.rs"]
mod tests;
