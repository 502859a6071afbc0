use std::sync::Once;

use carousel_core::{
    parse_manifest_list, HarvestRun, HarvestedImage, ManifestError, SkipReason, Stage,
};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(carousel_logging::initialize_for_tests);
}

fn image(manifest_url: &str) -> HarvestedImage {
    HarvestedImage::new(
        format!("{manifest_url}/img"),
        manifest_url.to_string(),
        None,
        None,
    )
    .unwrap()
}

fn urls(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("https://m.example.org/{i}")).collect()
}

#[test]
fn manifest_list_trims_and_ignores_blank_and_repeated_lines() {
    let input = " https://a.example.org/m \n\n\r\nhttps://b.example.org/m\n   \nhttps://a.example.org/m\n";
    assert_eq!(
        parse_manifest_list(input),
        vec![
            "https://a.example.org/m".to_string(),
            "https://b.example.org/m".to_string(),
        ]
    );
}

#[test]
fn run_visits_every_manifest_once_in_shuffled_order() {
    let mut rng = StdRng::seed_from_u64(3);
    let input = urls(12);
    let mut run = HarvestRun::start(&input, 100, &mut rng);
    assert_eq!(run.stage(), Stage::Idle);

    let mut visited = Vec::new();
    while let Some(url) = run.next_manifest() {
        assert_eq!(run.stage(), Stage::Fetching);
        assert_eq!(run.current(), Some(url.as_str()));
        visited.push(url);
        run.skip(SkipReason::NoSelection);
    }
    assert_eq!(run.stage(), Stage::Done);

    let mut sorted = visited.clone();
    sorted.sort();
    let mut expected = input.clone();
    expected.sort();
    assert_eq!(sorted, expected);
}

#[test]
fn run_stops_at_target_count() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(5);
    let mut run = HarvestRun::start(&urls(10), 3, &mut rng);

    let mut fetched = 0;
    while let Some(url) = run.next_manifest() {
        fetched += 1;
        run.record(image(&url));
    }

    assert!(run.is_complete());
    assert_eq!(fetched, 3);
    let summary = run.finish();
    assert_eq!(summary.images.len(), 3);
    assert!(summary.skipped.is_empty());
}

#[test]
fn skips_remember_stage_and_reason() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(1);
    let mut run = HarvestRun::start(&urls(2), 5, &mut rng);

    let first = run.next_manifest().unwrap();
    run.skip(SkipReason::Fetch("http status 404".to_string()));

    let second = run.next_manifest().unwrap();
    run.advance(Stage::Normalizing);
    run.skip(SkipReason::Manifest(ManifestError::Unrecognized));

    assert_eq!(run.next_manifest(), None);
    let summary = run.finish();
    assert!(summary.images.is_empty());
    assert_eq!(summary.skipped.len(), 2);
    assert_eq!(summary.skipped[0].manifest_url, first);
    assert_eq!(summary.skipped[0].stage, Stage::Fetching);
    assert_eq!(summary.skipped[1].manifest_url, second);
    assert_eq!(summary.skipped[1].stage, Stage::Normalizing);
    assert_eq!(
        summary.skipped[1].reason.to_string(),
        "manifest has no usable canvas list"
    );
}

#[test]
fn empty_input_finishes_immediately() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut run = HarvestRun::start(&[], 5, &mut rng);
    assert_eq!(run.next_manifest(), None);
    assert_eq!(run.stage(), Stage::Done);
    assert!(run.finish().images.is_empty());
}
