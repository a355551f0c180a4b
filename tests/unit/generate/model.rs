use super::*;

fn scratch(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("unit_model").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn params() -> SamplingParams {
    SamplingParams {
        seed: 17,
        num_steps: 25,
        guidance_scale: 7.5,
    }
}

fn cmd(program: &str, args: &[&str]) -> ModelCommand {
    ModelCommand {
        program: program.to_string(),
        args: args.iter().map(|s| s.to_string()).collect(),
        env: BTreeMap::new(),
    }
}

#[test]
fn placeholders_are_substituted() {
    let c = cmd(
        "sd",
        &[
            "-p",
            "{prompt}",
            "--seed={seed}",
            "--steps",
            "{steps}",
            "--cfg",
            "{guidance}",
            "{width}x{height}",
            "-o",
            "{out}",
        ],
    );
    let args = c.render_args("a {seed} cat", &params(), (640, 384), Path::new("tmp/o.png"));
    assert_eq!(
        args,
        vec![
            "-p",
            "a {seed} cat",
            "--seed=17",
            "--steps",
            "25",
            "--cfg",
            "7.5",
            "640x384",
            "-o",
            "tmp/o.png"
        ]
    );
}

#[test]
fn config_requires_program_and_out_placeholder() {
    assert!(cmd("", &["{out}"]).validate().is_err());
    assert!(matches!(
        cmd("sd", &["-p", "{prompt}"]).validate(),
        Err(ReelError::Config(_))
    ));
    assert!(cmd("sd", &["-o", "{out}"]).validate().is_ok());
}

#[test]
fn config_loads_from_json() {
    let dir = scratch("json");
    let path = dir.join("model.json");
    std::fs::write(
        &path,
        r#"{ "program": "sd", "args": ["-o", "{out}"], "env": { "SD_THREADS": "4" } }"#,
    )
    .unwrap();
    let c = ModelCommand::from_path(&path).unwrap();
    assert_eq!(c.program, "sd");
    assert_eq!(c.env.get("SD_THREADS").map(String::as_str), Some("4"));

    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        ModelCommand::from_path(&path),
        Err(ReelError::Config(_))
    ));
}

#[cfg(unix)]
#[test]
fn command_model_reads_back_written_png() {
    let dir = scratch("roundtrip");
    let fixture = dir.join("fixture.png");
    RgbaImage::from_pixel(8, 6, image::Rgba([9, 8, 7, 255]))
        .save(&fixture)
        .unwrap();

    let script = format!("cp '{}' \"$0\"", fixture.display());
    let c = cmd("sh", &["-c", script.as_str(), "{out}"]);
    let mut model = CommandModel::new(c, 8, 6, dir.join("scratch")).unwrap();

    let img = model.generate("anything", &params()).unwrap();
    assert_eq!(img.dimensions(), (8, 6));
    assert_eq!(img.get_pixel(0, 0).0, [9, 8, 7, 255]);

    assert!(std::fs::read_dir(model.scratch_dir()).unwrap().count() > 0);
    model.reset_session().unwrap();
    assert_eq!(std::fs::read_dir(model.scratch_dir()).unwrap().count(), 0);
}

#[cfg(unix)]
#[test]
fn failing_or_silent_command_is_model_invocation_error() {
    let dir = scratch("failing");
    let mut failing = CommandModel::new(
        cmd("sh", &["-c", "echo nope >&2; exit 3", "{out}"]),
        8,
        8,
        dir.join("a"),
    )
    .unwrap();
    let err = failing.generate("x", &params()).unwrap_err();
    assert!(matches!(err, ReelError::ModelInvocation(_)));
    assert!(err.to_string().contains("nope"));

    let mut silent =
        CommandModel::new(cmd("sh", &["-c", "true", "{out}"]), 8, 8, dir.join("b")).unwrap();
    assert!(matches!(
        silent.generate("x", &params()),
        Err(ReelError::ModelInvocation(_))
    ));

    let mut missing = CommandModel::new(
        cmd("imagereel-no-such-program", &["{out}"]),
        8,
        8,
        dir.join("c"),
    )
    .unwrap();
    assert!(matches!(
        missing.generate("x", &params()),
        Err(ReelError::ModelInvocation(_))
    ));
}

#[cfg(unix)]
#[test]
fn stale_output_that_cannot_be_removed_is_reported() {
    let dir = scratch("stale");
    let mut model =
        CommandModel::new(cmd("sh", &["-c", "true", "{out}"]), 8, 8, dir.join("s")).unwrap();
    // A directory where the first output file goes cannot be removed as a file.
    std::fs::create_dir_all(model.scratch_dir().join("sample_000000.png")).unwrap();

    let err = model.generate("x", &params()).unwrap_err();
    assert!(matches!(err, ReelError::Other(_)), "{err}");
    assert!(err.to_string().contains("sample_000000.png"));
}
