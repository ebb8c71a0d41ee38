//! Tests for icon detection across the template store

use crate::error::{SkillError, SkillResult};
use crate::skill_automation::match_image::{
    CycleOutcome, IconDetector, IconLocator, MatchConfig, Template, TemplateMeta, TemplateStore,
    create_fixed_position_config, create_scaled_icon_config,
};
use crate::template_matching::{
    CorrelationMethod, HashMatrix, MatchResult, MatchThreshold, SearchStrategy,
};
use image::{Rgb, RgbImage, imageops};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;

fn noise(width: u32, height: u32, seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    RgbImage::from_fn(width, height, |_, _| {
        Rgb([rng.random(), rng.random(), rng.random()])
    })
}

fn threshold(value: f32) -> MatchThreshold {
    MatchThreshold::new(value).unwrap()
}

/// Locator returning canned results per template id
struct ScriptedLocator {
    results: HashMap<String, MatchResult>,
}

impl IconLocator for ScriptedLocator {
    fn locate(&self, _region: &RgbImage, template: &Template) -> SkillResult<MatchResult> {
        let scripted = self.results.get(&template.id).cloned().unwrap_or_else(MatchResult::not_found);
        // Acceptance is still decided by the template's own threshold
        Ok(MatchResult {
            found: template.threshold.accepts(scripted.confidence),
            ..scripted
        })
    }
}

fn scripted_detector() -> IconDetector {
    let results = HashMap::from([
        ("A".to_string(), MatchResult::missed(0.85, Some((2, 3)))),
        ("B".to_string(), MatchResult::missed(0.95, Some((30, 4)))),
    ]);
    IconDetector::with_locator(Arc::new(ScriptedLocator { results }), MatchConfig::default())
}

#[test]
fn test_first_accepted_template_wins_in_store_order() {
    let mut store = TemplateStore::default();
    store
        .add("A", noise(16, 16, 1), TemplateMeta::default().with_threshold(threshold(0.9)))
        .unwrap();
    store
        .add("B", noise(16, 16, 2), TemplateMeta::default().with_threshold(threshold(0.8)))
        .unwrap();

    let region = noise(64, 32, 3);
    let result = scripted_detector().evaluate(&region, store.get_all(), 0.72).unwrap();

    // A (0.85) misses its own 0.9 threshold and must not short-circuit
    assert_eq!(
        result.outcome,
        CycleOutcome::Matched {
            template_id: "B".to_string(),
            similarity: 0.95,
            location: Some((30, 4)),
        }
    );
    assert_eq!(result.evaluations.len(), 2);
}

#[test]
fn test_matched_template_skips_the_rest() {
    let mut store = TemplateStore::default();
    store
        .add("B", noise(16, 16, 2), TemplateMeta::default().with_threshold(threshold(0.8)))
        .unwrap();
    store
        .add("A", noise(16, 16, 1), TemplateMeta::default().with_threshold(threshold(0.5)))
        .unwrap();

    let result = scripted_detector()
        .evaluate(&noise(64, 32, 3), store.get_all(), 0.72)
        .unwrap();
    assert!(result.is_match());
    assert_eq!(result.evaluations.len(), 1);
    assert_eq!(result.evaluations[0].template_id, "B");
}

#[test]
fn test_real_region_picks_present_icon() {
    let icon_a = noise(16, 16, 10);
    let icon_b = noise(16, 16, 11);
    let mut store = TemplateStore::default();
    store.add("A", icon_a, TemplateMeta::default()).unwrap();
    store.add("B", icon_b.clone(), TemplateMeta::default()).unwrap();

    let mut region = noise(48, 28, 12);
    imageops::replace(&mut region, &icon_b, 21, 7);

    let detector = IconDetector::new(MatchConfig::default());
    let result = detector.evaluate(&region, store.get_all(), 0.72).unwrap();
    match result.outcome {
        CycleOutcome::Matched {
            template_id,
            similarity,
            location,
        } => {
            assert_eq!(template_id, "B");
            assert!(similarity >= 0.9);
            assert_eq!(location, Some((21, 7)));
        }
        other => panic!("expected a match, got {:?}", other),
    }
}

#[test]
fn test_both_icons_present_registration_order_decides() {
    let icon_a = noise(16, 16, 20);
    let icon_b = noise(16, 16, 21);
    let mut region = noise(60, 24, 22);
    imageops::replace(&mut region, &icon_b, 2, 4);
    imageops::replace(&mut region, &icon_a, 40, 4);

    let mut store = TemplateStore::default();
    store.add("A", icon_a, TemplateMeta::default()).unwrap();
    store.add("B", icon_b, TemplateMeta::default()).unwrap();

    let result = IconDetector::new(MatchConfig::default())
        .evaluate(&region, store.get_all(), 0.72)
        .unwrap();
    assert!(matches!(
        result.outcome,
        CycleOutcome::Matched { ref template_id, location: Some((40, 4)), .. } if template_id == "A"
    ));
}

#[test]
fn test_unrecognized_bright_region_is_candidate_new_icon() {
    let mut store = TemplateStore::default();
    store.add("A", noise(16, 16, 30), TemplateMeta::default()).unwrap();

    let region = noise(24, 24, 31);
    let result = IconDetector::new(MatchConfig::default())
        .evaluate(&region, store.get_all(), 0.72)
        .unwrap();
    match result.outcome {
        CycleOutcome::CandidateNewIcon { foreground_ratio } => assert!(foreground_ratio > 0.1),
        other => panic!("expected a candidate new icon, got {:?}", other),
    }
    assert!(result.best_similarity() < 0.72);
    assert!(result.best_similarity() > 0.0);
}

#[test]
fn test_near_miss_is_not_a_new_icon() {
    let mut store = TemplateStore::default();
    store
        .add("A", noise(16, 16, 1), TemplateMeta::default().with_threshold(threshold(0.9)))
        .unwrap();
    let results = HashMap::from([("A".to_string(), MatchResult::missed(0.8, Some((0, 0))))]);
    let detector =
        IconDetector::with_locator(Arc::new(ScriptedLocator { results }), MatchConfig::default());

    // 0.8 is below the match threshold but above the new-icon threshold
    let result = detector.evaluate(&noise(32, 32, 5), store.get_all(), 0.72).unwrap();
    assert_eq!(result.outcome, CycleOutcome::NoMatch { best_similarity: 0.8 });
}

#[test]
fn test_threshold_boundary_through_detector() {
    let mut store = TemplateStore::default();
    store
        .add("A", noise(16, 16, 1), TemplateMeta::default().with_threshold(threshold(0.85)))
        .unwrap();

    let exact = HashMap::from([("A".to_string(), MatchResult::missed(0.85, Some((1, 1))))]);
    let detector =
        IconDetector::with_locator(Arc::new(ScriptedLocator { results: exact }), MatchConfig::default());
    assert!(detector.evaluate(&noise(20, 20, 2), store.get_all(), 0.72).unwrap().is_match());

    let below = HashMap::from([(
        "A".to_string(),
        MatchResult::missed(0.85 - f32::EPSILON, Some((1, 1))),
    )]);
    let detector =
        IconDetector::with_locator(Arc::new(ScriptedLocator { results: below }), MatchConfig::default());
    assert!(!detector.evaluate(&noise(20, 20, 2), store.get_all(), 0.72).unwrap().is_match());
}

#[test]
fn test_empty_template_image_is_reported() {
    let broken = Template {
        id: "broken".to_string(),
        image: Arc::new(RgbImage::new(0, 0)),
        hash: HashMatrix::from_bits(16, (0..256).map(|_| false)).unwrap(),
        threshold: MatchThreshold::default(),
        hotkey: "1".to_string(),
        display_text: "broken".to_string(),
        cooldown: std::time::Duration::from_millis(500),
    };
    let err = IconDetector::new(MatchConfig::default())
        .evaluate(&noise(20, 20, 1), &[broken], 0.72)
        .unwrap_err();
    assert!(matches!(err, SkillError::InvalidInput { .. }));
}

#[test]
fn test_fixed_position_config_finds_icon() {
    let icon = noise(16, 16, 40);
    let mut region = noise(40, 40, 41);
    imageops::replace(&mut region, &icon, 12, 9);

    let mut store = TemplateStore::default();
    store.add("A", icon, TemplateMeta::default()).unwrap();

    let config = create_fixed_position_config();
    assert_eq!(
        config.strategy,
        SearchStrategy::Direct(CorrelationMethod::CrossCorrelation)
    );
    let result = IconDetector::new(config).evaluate(&region, store.get_all(), 0.72).unwrap();
    assert!(matches!(
        result.outcome,
        CycleOutcome::Matched { location: Some((12, 9)), .. }
    ));
}

#[test]
fn test_match_config_defaults() {
    let config = MatchConfig::default();
    assert_eq!(config.hash_size, 16);
    assert_eq!(config.strategy, SearchStrategy::HashedWindow);
    assert_eq!(config.scale_factors, vec![1.0, 0.95, 1.05]);
    assert_eq!(config.background_luma, 30);
    assert_eq!(config.max_consecutive_failures, 3);

    let scaled = create_scaled_icon_config();
    assert_eq!(scaled.strategy, SearchStrategy::MultiScale);
    assert!(scaled.scale_factors.contains(&1.0));
}
