//! Fills a config record from the field catalog.
//!
//! The record's shape is walked through [`Bind`]; each bound leaf is looked up
//! in [`MetaConfig`] by tag, evaluated and assigned. Tags the catalog does not
//! know are logged and skipped so the record can grow ahead of the catalog.

use tracing::{debug, warn};

use crate::config::{Bind, ConfigVisitor, LeafMut};
use crate::error::{PipelineError, Result};
use crate::meta::{Environment, MetaConfig, Source};

/// Evaluate every bound leaf of `dst` against `src`.
///
/// All decode failures are collected and returned together.
pub fn unmarshal<T: Bind>(dst: &mut T, src: &MetaConfig, env: &dyn Environment) -> Result<()> {
    let mut binder = Binder {
        meta: src,
        env,
        errors: Vec::new(),
        sources: Vec::new(),
    };
    dst.visit(&mut binder);
    PipelineError::join(binder.errors)
}

/// Like [`unmarshal`], also reporting which layer supplied each leaf.
pub fn unmarshal_with_sources<T: Bind>(
    dst: &mut T,
    src: &MetaConfig,
    env: &dyn Environment,
) -> Result<Vec<(String, Source)>> {
    let mut binder = Binder {
        meta: src,
        env,
        errors: Vec::new(),
        sources: Vec::new(),
    };
    dst.visit(&mut binder);
    let Binder { errors, sources, .. } = binder;
    PipelineError::join(errors)?;
    Ok(sources)
}

/// Replace each field default with the matching leaf value of `config`.
///
/// Used to fold a config file underneath flags and environment.
pub fn fold_defaults<T: Bind + Clone>(meta: &mut MetaConfig, config: &T) -> Result<()> {
    let mut folder = DefaultFolder {
        meta,
        errors: Vec::new(),
    };
    config.clone().visit(&mut folder);
    PipelineError::join(folder.errors)
}

struct Binder<'a> {
    meta: &'a MetaConfig,
    env: &'a dyn Environment,
    errors: Vec<PipelineError>,
    sources: Vec<(String, Source)>,
}

impl ConfigVisitor for Binder<'_> {
    fn leaf(&mut self, tag: &str, mut leaf: LeafMut<'_>) {
        let Some(field) = self.meta.get(tag) else {
            warn!(tag, "No field registered for config tag, leaving it unchanged");
            return;
        };

        match field.evaluate_with_source(self.env) {
            Ok((value, source)) => {
                debug!(tag, %value, %source, "Bound config field");
                if leaf.set(value) {
                    self.sources.push((tag.to_string(), source));
                } else {
                    self.errors.push(PipelineError::TypeMismatch {
                        field: tag.to_string(),
                        expected: leaf.kind().as_str(),
                        actual: field.kind.as_str(),
                    });
                }
            }
            Err(e) => self.errors.push(e),
        }
    }
}

struct DefaultFolder<'a> {
    meta: &'a mut MetaConfig,
    errors: Vec<PipelineError>,
}

impl ConfigVisitor for DefaultFolder<'_> {
    fn leaf(&mut self, tag: &str, leaf: LeafMut<'_>) {
        let Some(field) = self.meta.get_mut(tag) else {
            warn!(tag, "No field registered for config tag, ignoring file value");
            return;
        };
        if let Err(e) = field.set_default_value(leaf.get()) {
            self.errors.push(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::meta::Value;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_unmarshal_defaults_match_config_default() {
        let meta = MetaConfig::new().unwrap();
        let mut config = Config {
            image_tag: String::new(),
            ..Config::default()
        };
        unmarshal(&mut config, &meta, &HashMap::new()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_every_bound_leaf_equals_field_evaluation() {
        let mut meta = MetaConfig::new().unwrap();
        meta.get_mut("ImageBuildPlatform")
            .unwrap()
            .set_slot("linux/amd64");
        let vars = env(&[
            ("WFE_IMAGE_TAG", "x:1"),
            ("WFE_IMAGE_BUILD_SQUASH_LAYERS", "on"),
            ("WFE_IMAGE_BUILD_SAVE_PROGRESS_INTERVAL", "30"),
            ("WFE_IMAGE_PUBLISH_ARTIFACT_PATHS", "a.json, b.json"),
        ]);

        let mut config = Config::default();
        unmarshal(&mut config, &meta, &vars).unwrap();

        for (tag, value) in config.leaves() {
            let field = meta.get(&tag).expect("every bound tag has a field");
            assert_eq!(field.evaluate(&vars).unwrap(), value, "{tag}");
        }
        assert_eq!(config.image_tag, "x:1");
        assert_eq!(config.image_build.platform, "linux/amd64");
        assert!(config.image_build.squash_layers);
        assert_eq!(config.image_build.save_progress_interval, 30);
        assert_eq!(config.image_publish.artifact_paths, vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_every_catalog_field_is_bound() {
        let meta = MetaConfig::new().unwrap();
        let tags: Vec<String> = Config::default().leaves().into_iter().map(|(t, _)| t).collect();
        for field in meta.fields() {
            assert!(tags.iter().any(|t| t == field.name), "{} unbound", field.name);
        }
    }

    #[test]
    fn test_decode_failures_are_joined() {
        let meta = MetaConfig::new().unwrap();
        let vars = env(&[
            ("WFE_IMAGE_BUILD_SQUASH_LAYERS", "maybe"),
            ("WFE_IMAGE_BUILD_SAVE_PROGRESS_INTERVAL", "soon"),
        ]);
        let mut config = Config::default();
        let err = unmarshal(&mut config, &meta, &vars).unwrap_err();
        match err {
            PipelineError::Joined(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(errors
                    .iter()
                    .all(|e| matches!(e, PipelineError::Decode { .. })));
            }
            other => panic!("expected joined decode errors, got {other:?}"),
        }
    }

    #[test]
    fn test_sources_reported() {
        let mut meta = MetaConfig::new().unwrap();
        meta.get_mut("ImageTag").unwrap().set_slot("y:2");
        let vars = env(&[("WFE_ARTIFACT_DIRECTORY", "out")]);
        let mut config = Config::default();
        let sources = unmarshal_with_sources(&mut config, &meta, &vars).unwrap();
        let source_of = |tag: &str| sources.iter().find(|(t, _)| t == tag).map(|(_, s)| *s);
        assert_eq!(source_of("ImageTag"), Some(Source::Flag));
        assert_eq!(source_of("ArtifactDir"), Some(Source::Env));
        assert_eq!(source_of("CliInterface"), Some(Source::Default));
    }

    #[test]
    fn test_fold_defaults_sits_below_env_and_flags() {
        let mut meta = MetaConfig::new().unwrap();
        let mut file = Config::default();
        file.image_tag = "file:1".to_string();
        file.artifact_dir = "file-artifacts".to_string();
        file.image_build.dockerfile = "Containerfile".to_string();
        fold_defaults(&mut meta, &file).unwrap();

        meta.get_mut("ImageBuildDockerfile")
            .unwrap()
            .set_slot("Dockerfile.flag");
        let vars = env(&[("WFE_ARTIFACT_DIRECTORY", "env-artifacts")]);

        let mut config = Config::default();
        unmarshal(&mut config, &meta, &vars).unwrap();
        assert_eq!(config.image_tag, "file:1");
        assert_eq!(config.artifact_dir, "env-artifacts");
        assert_eq!(config.image_build.dockerfile, "Dockerfile.flag");
    }

    #[test]
    fn test_fold_defaults_keeps_list_items_verbatim() {
        let mut meta = MetaConfig::new().unwrap();
        let mut file = Config::default();
        file.image_publish.artifact_paths =
            vec!["reports/a,b.json".to_string(), " padded.json ".to_string()];
        fold_defaults(&mut meta, &file).unwrap();

        let mut config = Config::default();
        unmarshal(&mut config, &meta, &HashMap::new()).unwrap();
        assert_eq!(
            config.image_publish.artifact_paths,
            vec!["reports/a,b.json", " padded.json "]
        );
    }

    #[test]
    fn test_flag_equal_to_file_default_is_ignored() {
        let mut meta = MetaConfig::new().unwrap();
        let mut file = Config::default();
        file.image_tag = "file:1".to_string();
        fold_defaults(&mut meta, &file).unwrap();
        meta.get_mut("ImageTag").unwrap().set_slot("file:1");

        let value = meta
            .evaluate("ImageTag", &env(&[("WFE_IMAGE_TAG", "env:1")]))
            .unwrap();
        assert_eq!(value, Value::String("env:1".into()));
    }

    struct Extended {
        base: Config,
        extra: String,
    }

    impl Bind for Extended {
        fn visit(&mut self, v: &mut dyn ConfigVisitor) {
            self.base.visit(v);
            v.leaf("NotInCatalog", LeafMut::String(&mut self.extra));
        }
    }

    #[test]
    fn test_unknown_tag_is_skipped() {
        let meta = MetaConfig::new().unwrap();
        let mut record = Extended {
            base: Config::default(),
            extra: "untouched".to_string(),
        };
        unmarshal(&mut record, &meta, &HashMap::new()).unwrap();
        assert_eq!(record.extra, "untouched");
        assert_eq!(record.base.image_tag, "my-app:latest");
    }
}
