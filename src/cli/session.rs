use std::{
    io::{BufRead, Write},
    path::PathBuf,
};

use tracing::info;

use crate::{
    cli::params::{ask_run_again, edit_interactively},
    foundation::error::{ReelError, ReelResult},
    generate::{
        driver::{GenerationReport, GenerationRequest, run_generation},
        model::TextToImage,
        upscale::Upscaler,
    },
    naming::names::NameGenerator,
};

/// Keeps the built model across runs and rebuilds it only when the output size changes.
pub struct ModelCache<F> {
    factory: F,
    current: Option<Box<dyn TextToImage>>,
    builds: usize,
}

impl<F> ModelCache<F>
where
    F: FnMut(u32, u32) -> ReelResult<Box<dyn TextToImage>>,
{
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            current: None,
            builds: 0,
        }
    }

    /// How many times the factory has been invoked.
    pub fn builds(&self) -> usize {
        self.builds
    }

    pub fn get(&mut self, width: u32, height: u32) -> ReelResult<&mut dyn TextToImage> {
        let stale = self
            .current
            .as_ref()
            .is_none_or(|m| m.dimensions() != (width, height));
        if stale {
            info!(width, height, "building model");
            self.current = Some((self.factory)(width, height)?);
            self.builds += 1;
        }
        match self.current.as_deref_mut() {
            Some(model) => Ok(model),
            None => Err(ReelError::model("model factory produced no model")),
        }
    }
}

/// How a generation session talks to the user.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// Walk the parameter editor before the first run.
    pub edit_first: bool,
    /// Offer further runs after each one.
    pub allow_rerun: bool,
    pub out_dir: PathBuf,
}

/// Runs generation once, then keeps re-editing and re-running while the user answers `y`.
pub fn run_session<F, R, W>(
    mut request: GenerationRequest,
    opts: &SessionOptions,
    models: &mut ModelCache<F>,
    upscaler: &dyn Upscaler,
    input: &mut R,
    out: &mut W,
) -> ReelResult<Vec<GenerationReport>>
where
    F: FnMut(u32, u32) -> ReelResult<Box<dyn TextToImage>>,
    R: BufRead,
    W: Write,
{
    request.clamp_dimensions();
    if opts.edit_first {
        edit_interactively(&mut request, input, out)?;
    }

    let mut reports = Vec::new();
    loop {
        request.clamp_dimensions();
        let model = models.get(request.width, request.height)?;
        let names = NameGenerator::new(&opts.out_dir);
        reports.push(run_generation(model, &request, &names, upscaler)?);

        if !opts.allow_rerun || !ask_run_again(input, out)? {
            break;
        }
        edit_interactively(&mut request, input, out)?;
    }
    Ok(reports)
}

#[cfg(test)]
#[path = "../../tests/unit/cli/session.rs"]
mod tests;
