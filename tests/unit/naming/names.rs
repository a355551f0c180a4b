use std::collections::BTreeSet;

use super::*;

fn names() -> NameGenerator {
    NameGenerator::with_timestamp("out", "2024_05_01_13_")
}

fn prompts(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn file_name(n: &OutputName) -> String {
    n.path.file_name().unwrap().to_string_lossy().into_owned()
}

#[test]
fn count_is_prompts_times_batch() {
    for (p, b) in [(1usize, 1u32), (2, 3), (3, 10), (1, 12)] {
        let list: Vec<String> = (0..p).map(|i| format!("prompt {i}")).collect();
        let out = names().generate(&list, b, 7);
        assert_eq!(out.len(), p * b as usize);
    }
}

#[test]
fn names_are_pairwise_distinct_even_for_repeated_prompts() {
    let out = names().generate(&prompts(&["same", "same", "other"]), 4, 100);
    let unique: BTreeSet<_> = out.iter().map(|n| n.path.clone()).collect();
    assert_eq!(unique.len(), out.len());
}

#[test]
fn layout_matches_expected_format() {
    let out = names().generate(&prompts(&["a happy cat"]), 2, 42);
    assert_eq!(file_name(&out[0]), "2024_05_01_13_a_happy_cat_s42_b0.png");
    assert_eq!(file_name(&out[1]), "2024_05_01_13_a_happy_cat_s42_b1.png");
    assert_eq!(out[0].path.parent().unwrap(), Path::new("out"));
}

#[test]
fn batch_padding_width_follows_batch_size() {
    let out = names().generate(&prompts(&["x"]), 12, 0);
    assert!(file_name(&out[0]).ends_with("_b00.png"));
    assert!(file_name(&out[11]).ends_with("_b11.png"));

    let mut lexical: Vec<String> = out.iter().map(file_name).collect();
    lexical.sort();
    let in_order: Vec<String> = out.iter().map(file_name).collect();
    assert_eq!(lexical, in_order);
}

#[test]
fn repeated_prefixes_get_prompt_index_suffix() {
    let out = names().generate(&prompts(&["same", "same"]), 1, 5);
    assert_eq!(file_name(&out[0]), "2024_05_01_13_same_s5_b0.png");
    assert_eq!(file_name(&out[1]), "2024_05_01_13_same_p1_s5_b0.png");
    assert_eq!(out[1].seed, 6);
}

#[test]
fn prompts_are_truncated_to_budget() {
    let long = "word ".repeat(30);
    let out = names().generate(std::slice::from_ref(&long), 1, 1);
    let name = file_name(&out[0]);
    let stem = name
        .strip_prefix("2024_05_01_13_")
        .unwrap()
        .split("_s1_")
        .next()
        .unwrap();
    assert_eq!(stem.chars().count(), PROMPT_BUDGET);

    let stepped = names().generate_with_steps(std::slice::from_ref(&long), 1, 1, 10, 5);
    let name = file_name(&stepped[0]);
    let stem = name
        .strip_prefix("2024_05_01_13_")
        .unwrap()
        .split("_s1_")
        .next()
        .unwrap();
    assert_eq!(stem.chars().count(), STEPPED_PROMPT_BUDGET);
}

#[test]
fn sanitize_replaces_spaces_and_separators() {
    assert_eq!(sanitize_prompt("a b/c\\d", 40), "a_b_c_d");
    assert_eq!(sanitize_prompt("héllo wörld", 4), "héll");
}

#[test]
fn stepped_count_and_suffixes() {
    let out = names().generate_with_steps(&prompts(&["a", "b"]), 2, 9, 50, 5);
    assert_eq!(out.len(), 2 * 2 * (50 / 5));

    let steps: BTreeSet<u32> = out.iter().filter_map(|n| n.key.step).collect();
    let expected: BTreeSet<u32> = (0..10).map(|s| s * 5).collect();
    assert_eq!(steps, expected);

    assert!(file_name(&out[0]).ends_with("_s9_0_step00.png"));
    assert!(file_name(&out[9]).ends_with("_s9_0_step45.png"));
    // Step loop is innermost, then batch, then prompt.
    assert_eq!(out[10].key.batch_index, 1);
    assert_eq!(out[10].seed, 10);
    assert_eq!(out[20].key.prompt_index, 1);
    assert_eq!(out[20].seed, 11);
}

#[test]
fn plan_lookup_and_coverage() {
    let plan: OutputPlan = names()
        .generate_with_steps(&prompts(&["a"]), 1, 0, 12, 5)
        .into_iter()
        .collect();
    assert_eq!(plan.len(), 2);

    let key = |step| OutputKey {
        prompt_index: 0,
        batch_index: 0,
        step: Some(step),
    };
    assert!(plan.get(&key(5)).is_some());
    assert!(plan.ensure_covers(&[key(5)]).is_ok());

    let err = plan.ensure_covers(&[key(5), key(10)]).unwrap_err();
    assert!(matches!(
        err,
        ReelError::NamingMismatch {
            expected: 2,
            actual: 1
        }
    ));
}

#[test]
fn item_seed_is_linear_in_iteration_order() {
    let mut seen = Vec::new();
    for p in 0..3 {
        for b in 0..4 {
            seen.push(item_seed(1000, p, 4, b));
        }
    }
    assert_eq!(seen, (1000..1012).collect::<Vec<u64>>());
}
