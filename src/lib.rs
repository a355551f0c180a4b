//! imagereel turns text prompts into batches of images and folders of images into GIFs.
//!
//! Two independent pipelines live here:
//!
//! 1. **Generate**: `GenerationRequest -> OutputPlan -> TextToImage calls -> PNG files`,
//!    optionally upscaled in place and plotted as a contact sheet.
//! 2. **Assemble**: `folder of stills -> sorted RGBA frames -> (optional white fade) -> GIF`.
//!
//! The text-to-image model is an external collaborator behind [`TextToImage`];
//! [`CommandModel`] drives any program that can write a PNG for a prompt.
#![forbid(unsafe_code)]

mod assets;
mod cli;
mod foundation;
mod generate;
mod gif;
mod layout;
mod naming;

pub use assets::decode::decode_frame;
pub use cli::params::{
    PROMPT_SEPARATOR, Param, ask_run_again, defaults, edit_interactively, help_text, parse_bool,
    parse_prompts, random_seed,
};
pub use cli::session::{ModelCache, SessionOptions, run_session};
pub use foundation::error::{ReelError, ReelResult};
pub use generate::driver::{GenerationReport, GenerationRequest, MIN_DIMENSION, run_generation};
pub use generate::model::{CommandModel, ModelCommand, SamplingParams, TextToImage};
pub use generate::plot::{contact_sheet, figure_path_for, plot_images};
pub use generate::upscale::{LanczosUpscaler, Upscaler, scaled_dimensions};
pub use gif::assemble::{
    FADE_EXTENSIONS, GifAssembler, OS_METADATA_FILE, assemble_gif, write_gif,
};
pub use gif::fade::{FadeRamp, apply_fade, overlay_white_in_place};
pub use layout::grid::{DEFAULT_MAX_COLUMNS, GridShape, compute_grid};
pub use naming::names::{
    NameGenerator, OutputKey, OutputName, OutputPlan, PROMPT_BUDGET, STEPPED_PROMPT_BUDGET,
    item_seed, pad_index, sanitize_prompt,
};
