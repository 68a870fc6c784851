//! Config validation
//!
//! Rules:
//! - field ranges (derived `Validate` on the blueprint types)
//! - module names unique and non-empty
//! - feature selection non-empty
//! - explanation and score directories distinct
//! - test sampling fits inside the pooled example budget

use std::collections::{HashMap, HashSet};

use ::validator::Validate;
use contracts::{ContractError, FeatureId, RunBlueprint};

/// Validate a RunBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    validate_ranges(blueprint)?;
    validate_modules(blueprint)?;
    validate_feature_selection(blueprint)?;
    validate_output(blueprint)?;
    validate_sampling(blueprint)?;
    Ok(())
}

/// Field-level range checks
fn validate_ranges(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("blueprint", e.to_string()))
}

/// Module names unique and non-empty
///
/// Two modules that fold to the same file-name stem (`layer0/resid` and
/// `layer0_resid`) would write their artifacts to the same path, so they
/// count as duplicates too.
fn validate_modules(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    let mut stems: HashMap<String, &String> = HashMap::new();
    for (idx, module) in blueprint.feature.modules.iter().enumerate() {
        if module.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("feature.modules[{idx}]"),
                "module name cannot be empty",
            ));
        }
        if !seen.insert(module) {
            return Err(ContractError::config_validation(
                format!("feature.modules[{idx}]"),
                format!("duplicate module '{module}'"),
            ));
        }
        if let Some(other) = stems.insert(FeatureId::module_stem(module), module) {
            return Err(ContractError::config_validation(
                format!("feature.modules[{idx}]"),
                format!("module '{module}' collides with '{other}' in artifact file names"),
            ));
        }
    }
    Ok(())
}

/// Feature selection, when given, must select something
fn validate_feature_selection(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    match &blueprint.feature.features {
        Some(selection) if selection.is_empty() => Err(ContractError::config_validation(
            "feature.features",
            "feature selection is empty",
        )),
        _ => Ok(()),
    }
}

/// Output directories must not collide, artifacts are keyed by feature only
fn validate_output(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    let output = &blueprint.output;
    if output.explanation_dir == output.score_dir {
        return Err(ContractError::config_validation(
            "output.explanation_dir / output.score_dir",
            format!(
                "explanation_dir and score_dir must differ, both are '{}'",
                output.explanation_dir.display()
            ),
        ));
    }
    Ok(())
}

/// Train examples must fit inside the pooled windows
fn validate_sampling(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    let experiment = &blueprint.experiment;
    if experiment.n_examples_train > blueprint.feature.max_examples {
        return Err(ContractError::config_validation(
            "experiment.n_examples_train",
            format!(
                "n_examples_train ({}) must be <= feature.max_examples ({})",
                experiment.n_examples_train, blueprint.feature.max_examples
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        ClientConfig, ConfigVersion, ExperimentConfig, ExplainerConfig, FeatureConfig,
        FeatureSelection, OutputConfig, PipelineSettings, ScorerConfig,
    };

    fn minimal_blueprint() -> RunBlueprint {
        RunBlueprint {
            version: ConfigVersion::V1,
            client: ClientConfig {
                base_url: "http://localhost:8000/v1".into(),
                model: "llama".into(),
                api_key_env: None,
                timeout_secs: 60,
                headers: Default::default(),
            },
            feature: FeatureConfig {
                raw_dir: "raw".into(),
                modules: vec!["layer0".into()],
                features: None,
                example_ctx_len: 20,
                max_examples: 100,
            },
            experiment: ExperimentConfig::default(),
            explainer: ExplainerConfig::default(),
            scorer: ScorerConfig::default(),
            output: OutputConfig {
                explanation_dir: "out/explanations".into(),
                score_dir: "out/scores".into(),
            },
            pipeline: PipelineSettings::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_duplicate_module() {
        let mut bp = minimal_blueprint();
        bp.feature.modules.push("layer0".into());
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate module"), "got: {err}");
    }

    #[test]
    fn test_colliding_module_names() {
        let mut bp = minimal_blueprint();
        bp.feature.modules = vec!["layer0/resid".into(), "layer0_resid".into()];
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("collides with 'layer0/resid'"), "got: {err}");
        assert!(err.contains("feature.modules[1]"), "got: {err}");
    }

    #[test]
    fn test_empty_module_list() {
        let mut bp = minimal_blueprint();
        bp.feature.modules.clear();
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_empty_feature_range() {
        let mut bp = minimal_blueprint();
        bp.feature.features = Some(FeatureSelection::Range { start: 5, end: 5 });
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("feature selection is empty"), "got: {err}");
    }

    #[test]
    fn test_same_output_dirs() {
        let mut bp = minimal_blueprint();
        bp.output.score_dir = bp.output.explanation_dir.clone();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("must differ"), "got: {err}");
    }

    #[test]
    fn test_zero_batch_size() {
        let mut bp = minimal_blueprint();
        bp.scorer.batch_size = 0;
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_train_exceeds_pool() {
        let mut bp = minimal_blueprint();
        bp.experiment.n_examples_train = 500;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("n_examples_train"), "got: {err}");
    }
}
