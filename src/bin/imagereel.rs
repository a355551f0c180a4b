use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};
use imagereel::{
    CommandModel, GenerationRequest, LanczosUpscaler, ModelCache, ModelCommand, SessionOptions,
    TextToImage, assemble_gif, defaults, parse_bool, random_seed, run_session,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "imagereel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stitch the stills of a folder into a looping GIF written into that folder.
    Gif(GifArgs),
    /// Generate images from text prompts with an external model.
    Generate(GenerateArgs),
}

#[derive(Parser, Debug)]
struct GifArgs {
    /// Folder holding the frames, in file-name order.
    folder: PathBuf,

    /// Seconds each frame is shown.
    #[arg(long, default_value_t = 0.2)]
    delay: f64,

    /// Overlay a white ramp that brightens frame by frame.
    #[arg(long, default_value_t = true, action = ArgAction::Set, value_parser = bool_arg)]
    fade: bool,
}

/// Flags that describe the run itself; when all are left at their defaults the
/// interactive editor opens before the first run.
#[derive(Args, Debug, Clone, PartialEq)]
struct GenerationFlags {
    /// Output width in pixels (min 128).
    #[arg(long, default_value_t = defaults::WIDTH)]
    width: u32,

    /// Output height in pixels (min 128).
    #[arg(long, default_value_t = defaults::HEIGHT)]
    height: u32,

    /// One or more prompts.
    #[arg(long, num_args = 1.., default_values_t = [defaults::PROMPT.to_string()])]
    prompts: Vec<String>,

    /// Images per prompt.
    #[arg(long = "batch_size", default_value_t = defaults::BATCH_SIZE)]
    batch_size: u32,

    /// Diffusion sampling steps.
    #[arg(long, default_value_t = defaults::STEPS)]
    steps: u32,

    /// Plot the last generated image.
    #[arg(long = "plot_output", default_value_t = defaults::PLOT_OUTPUT, action = ArgAction::Set, value_parser = bool_arg)]
    plot_output: bool,

    /// Seed of the first image (random when omitted).
    #[arg(long)]
    seed: Option<u64>,

    /// Upscale factor applied to every written image (1.0 = off).
    #[arg(long, default_value_t = defaults::UPSCALE)]
    upscale: f32,

    /// Export intermediate steps every `export_hop` steps.
    #[arg(long = "export_steps", default_value_t = defaults::EXPORT_STEPS, action = ArgAction::Set, value_parser = bool_arg)]
    export_steps: bool,

    /// Step interval for intermediate exports.
    #[arg(long = "export_hop", default_value_t = defaults::EXPORT_HOP)]
    export_hop: u32,

    /// Classifier-free guidance scale.
    #[arg(long, default_value_t = defaults::GUIDANCE)]
    guidance: f32,
}

/// The generation flags alone, so their defaults come from the same declarations.
#[derive(Parser, Debug)]
struct FlagsOnly {
    #[command(flatten)]
    flags: GenerationFlags,
}

impl GenerationFlags {
    /// Values clap fills in when no generation flag is given.
    fn declared_defaults() -> Self {
        FlagsOnly::parse_from(["imagereel"]).flags
    }

    fn into_request(self) -> GenerationRequest {
        GenerationRequest {
            prompts: self.prompts,
            batch_size: self.batch_size,
            steps: self.steps,
            seed: self.seed.unwrap_or_else(random_seed),
            guidance_scale: self.guidance,
            upscale_factor: self.upscale,
            export_intermediate_steps: self.export_steps,
            export_hop: self.export_hop,
            plot_output: self.plot_output,
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    flags: GenerationFlags,

    /// Directory generated images are written to.
    #[arg(long = "out-dir", default_value = "output_images")]
    out_dir: PathBuf,

    /// JSON file describing the external model command.
    #[arg(long = "model-config")]
    model_config: PathBuf,

    /// Run once with the given flags, without prompting.
    #[arg(long = "non-interactive", default_value_t = false)]
    non_interactive: bool,
}

fn bool_arg(s: &str) -> Result<bool, String> {
    parse_bool(s).map_err(|e| e.to_string())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Gif(args) => cmd_gif(args),
        Command::Generate(args) => cmd_generate(args),
    }
}

fn cmd_gif(args: GifArgs) -> anyhow::Result<()> {
    let out = assemble_gif(&args.folder, args.delay, args.fade)?;
    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let all_defaults = args.flags == GenerationFlags::declared_defaults();
    let cmd = ModelCommand::from_path(&args.model_config)?;
    let scratch_dir = scratch_dir_for(&args.out_dir);

    let mut models = ModelCache::new(move |width, height| {
        let model = CommandModel::new(cmd.clone(), width, height, scratch_dir.clone())?;
        Ok(Box::new(model) as Box<dyn TextToImage>)
    });

    let opts = SessionOptions {
        edit_first: all_defaults && !args.non_interactive,
        allow_rerun: !args.non_interactive,
        out_dir: args.out_dir,
    };

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut out = std::io::stdout();
    let reports = run_session(
        args.flags.into_request(),
        &opts,
        &mut models,
        &LanczosUpscaler,
        &mut input,
        &mut out,
    )?;

    for report in &reports {
        for path in &report.outputs {
            eprintln!("wrote {}", path.display());
        }
        if let Some(figure) = &report.figure {
            eprintln!("wrote {}", figure.display());
        }
    }
    Ok(())
}

fn scratch_dir_for(out_dir: &Path) -> PathBuf {
    out_dir.join(".model_scratch")
}

#[cfg(test)]
#[path = "../../tests/unit/bin/imagereel.rs"]
mod tests;
