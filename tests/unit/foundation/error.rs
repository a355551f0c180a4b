use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(ReelError::config("x").to_string().contains("config error:"));
    assert!(
        ReelError::empty_input("x")
            .to_string()
            .contains("empty input:")
    );
    assert!(
        ReelError::model("x")
            .to_string()
            .contains("model invocation error:")
    );
    assert!(
        ReelError::naming_mismatch(4, 3)
            .to_string()
            .contains("expected 4 output names, got 3")
    );
}

#[test]
fn decode_names_the_offending_path() {
    let err = ReelError::decode("frames/broken.png", anyhow::anyhow!("bad header"));
    let msg = err.to_string();
    assert!(msg.contains("frames/broken.png"));
    assert!(msg.contains("bad header"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ReelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
