use std::path::PathBuf;

use assetdag::actions::build_registry;
use assetdag::config::load_and_validate;
use assetdag::dag::{ExecutionPlan, PlanScope};

fn demo_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/Assetdag.toml")
}

#[test]
fn demo_config_validates() {
    let cfg = load_and_validate(demo_path()).unwrap();
    let registry = build_registry(&cfg).unwrap();

    assert_eq!(cfg.config.default_target, "default");
    assert_eq!(cfg.bindings().len(), 4);
    assert_eq!(registry.resolve("speed").unwrap().action().kind(), "audit");
    assert_eq!(registry.resolve("screenshots").unwrap().action().kind(), "screenshot");
}

#[test]
fn default_target_orders_styles_before_its_siblings() {
    let cfg = load_and_validate(demo_path()).unwrap();
    let registry = build_registry(&cfg).unwrap();

    let plan =
        ExecutionPlan::resolve(registry.graph(), &["default"], PlanScope::WithPrerequisites)
            .unwrap();

    assert_eq!(
        plan.batches(),
        &[
            vec!["clean".to_string()],
            vec!["styles".to_string()],
            vec!["images".to_string(), "lint".to_string(), "scripts".to_string()],
            vec!["default".to_string()],
        ]
    );
    assert_eq!(plan.batch_of("strip-styles"), None);
}

#[test]
fn dist_strips_styles_only_after_clean_styles_and_html() {
    let cfg = load_and_validate(demo_path()).unwrap();
    let registry = build_registry(&cfg).unwrap();

    let plan =
        ExecutionPlan::resolve(registry.graph(), &["dist"], PlanScope::WithPrerequisites).unwrap();
    let batch = |t: &str| plan.batch_of(t).unwrap();

    assert_eq!(plan.batches()[0], vec!["clean".to_string()]);
    assert!(batch("styles") > batch("clean"));
    assert!(batch("html") > batch("clean"));
    assert!(batch("strip-styles") > batch("styles"));
    assert!(batch("strip-styles") > batch("html"));
    assert!(batch("publish-styles") > batch("strip-styles"));
    assert_eq!(batch("dist"), plan.batches().len() - 1);
}

#[test]
fn audits_are_leaves() {
    let cfg = load_and_validate(demo_path()).unwrap();
    let registry = build_registry(&cfg).unwrap();

    for audit in ["speed", "speed-desktop"] {
        assert!(registry.graph().dependents_of(audit).is_empty());
    }
}
