//! Unit tests for provider selection

use vton_studio::provider::{resolve, resolve_stage, GarmentClass, ModelChoice};
use vton_studio::stage::Stage;

#[test]
fn test_resolve_by_stage_name() {
    let overlay = resolve("overlay", ModelChoice::Kling, GarmentClass::Lower).unwrap();
    assert_eq!(overlay.model(), "kling");
    assert_eq!(overlay.params().garment_type, Some(GarmentClass::Lower));

    let model = resolve("model", ModelChoice::Kling, GarmentClass::Upper).unwrap();
    assert_eq!(model.provider(), "replicate");
    assert_eq!(model.params().guidance, Some(3.5));

    assert!(resolve("upscale", ModelChoice::Leffa, GarmentClass::Upper).is_err());
}

#[test]
fn test_dimensions_only_for_kling_overlay() {
    for stage in Stage::ALL {
        for choice in ModelChoice::ALL {
            let config = resolve_stage(stage, choice, GarmentClass::Upper);
            let expected = (stage == Stage::Overlay && choice == ModelChoice::Kling).then_some(1024);
            assert_eq!(config.params().width, expected, "{} / {}", stage, choice);
            assert_eq!(config.params().height, expected, "{} / {}", stage, choice);
        }
    }
}
