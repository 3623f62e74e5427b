//! The catalog of every tunable, one [`MetaField`] per parameter.

use indexmap::IndexMap;

use crate::error::{PipelineError, Result};

use super::field::{Environment, MetaField};
use super::value::{FieldKind, Value};

/// Prefix shared by every environment key.
pub const ENV_PREFIX: &str = "WFE_";

type FieldRow = (
    &'static str,
    &'static str,
    &'static str,
    FieldKind,
    &'static str,
    &'static str,
);

// (tag, flag, env key, kind, default, description)
#[rustfmt::skip]
const FIELDS: &[FieldRow] = &[
    ("ImageTag", "tag", "WFE_IMAGE_TAG", FieldKind::String, "my-app:latest",
        "The full image tag for the target container image"),
    ("ArtifactDir", "artifact-dir", "WFE_ARTIFACT_DIRECTORY", FieldKind::String, "artifacts",
        "The target directory for all generated artifacts"),
    ("GatecheckBundleFilename", "bundle-filename", "WFE_GATECHECK_BUNDLE_FILENAME", FieldKind::String, "gatecheck-bundle.tar.gz",
        "The filename for the gatecheck bundle, a validatable archive of security artifacts"),
    ("CliInterface", "cli-interface", "WFE_CLI_INTERFACE", FieldKind::String, "docker",
        "Container CLI to drive: docker, podman, or bake (build only)"),

    ("ImageBuildEnabled", "build-enabled", "WFE_IMAGE_BUILD_ENABLED", FieldKind::Bool, "true",
        "Enable/Disable the image build pipeline"),
    ("ImageBuildDir", "build-dir", "WFE_IMAGE_BUILD_DIR", FieldKind::String, ".",
        "The build directory to use during an image build"),
    ("ImageBuildDockerfile", "dockerfile", "WFE_IMAGE_BUILD_DOCKERFILE", FieldKind::String, "Dockerfile",
        "The Dockerfile/Containerfile to use during an image build"),
    ("ImageBuildArgs", "build-args", "WFE_IMAGE_BUILD_ARGS", FieldKind::String, "",
        "Build time variables as a JSON object, e.g. {\"KEY\":\"value\"}"),
    ("ImageBuildPlatform", "platform", "WFE_IMAGE_BUILD_PLATFORM", FieldKind::String, "",
        "The target platform for build (e.g., linux/amd64)"),
    ("ImageBuildTarget", "target", "WFE_IMAGE_BUILD_TARGET", FieldKind::String, "",
        "The target build stage to build"),
    ("ImageBuildCacheTo", "cache-to", "WFE_IMAGE_BUILD_CACHE_TO", FieldKind::String, "",
        "Cache export destinations (e.g., \"user/app:cache\", \"type=local,src=path/to/dir\")"),
    ("ImageBuildCacheFrom", "cache-from", "WFE_IMAGE_BUILD_CACHE_FROM", FieldKind::String, "",
        "External cache sources (e.g., \"user/app:cache\", \"type=local,src=path/to/dir\")"),
    ("ImageBuildSquashLayers", "squash-layers", "WFE_IMAGE_BUILD_SQUASH_LAYERS", FieldKind::Bool, "false",
        "squash image layers - Only Supported with Podman CLI"),
    ("ImageBuildBakefile", "bakefile", "WFE_IMAGE_BUILD_BAKEFILE", FieldKind::String, "docker-bake.hcl",
        "The bake file used by the bake interface"),
    ("ImageBuildBakeTarget", "bake-target", "WFE_IMAGE_BUILD_BAKE_TARGET", FieldKind::String, "default",
        "The target in the bake file to build"),
    ("ImageBuildTarFilename", "image-tar-filename", "WFE_IMAGE_BUILD_TAR_FILENAME", FieldKind::String, "image.tar",
        "The filename of the saved image archive, relative to the artifact directory"),
    ("ImageBuildSaveProgressInterval", "progress-interval", "WFE_IMAGE_BUILD_SAVE_PROGRESS_INTERVAL", FieldKind::Int, "5",
        "Seconds between image archive size reports while saving, 0 disables"),

    ("ImageScanEnabled", "scan-enabled", "WFE_IMAGE_SCAN_ENABLED", FieldKind::Bool, "true",
        "Enable/Disable the image scan pipeline"),
    ("ImageScanSyftFilename", "sbom-filename", "WFE_IMAGE_SCAN_SYFT_FILENAME", FieldKind::String, "sbom-report.syft.json",
        "The filename for the syft SBOM report - must contain 'syft'"),
    ("ImageScanGrypeFilename", "grype-filename", "WFE_IMAGE_SCAN_GRYPE_FILENAME", FieldKind::String, "image-vulnerability-report.grype.json",
        "The filename for the grype vulnerability report - must contain 'grype'"),
    ("ImageScanClamavEnabled", "clamav-enabled", "WFE_IMAGE_SCAN_CLAMAV_ENABLED", FieldKind::Bool, "true",
        "Enable/Disable the antivirus scan in the image scan pipeline"),
    ("ImageScanClamavFilename", "clamav-filename", "WFE_IMAGE_SCAN_CLAMAV_FILENAME", FieldKind::String, "virus-report.clamav.txt",
        "The filename for the clamscan virus report - must contain 'clamav'"),
    ("ImageScanClamavTarget", "scan-target", "WFE_IMAGE_SCAN_CLAMAV_TARGET", FieldKind::String, "",
        "File or directory to scan for malware, defaults to the saved image archive"),
    ("ImageScanFreshclamDisabled", "freshclam-disabled", "WFE_IMAGE_SCAN_FRESHCLAM_DISABLED", FieldKind::Bool, "false",
        "Skip the virus database update before scanning"),

    ("CodeScanEnabled", "code-scan-enabled", "WFE_CODE_SCAN_ENABLED", FieldKind::Bool, "true",
        "Enable/Disable the code scan pipeline"),
    ("CodeScanGitleaksEnabled", "gitleaks-enabled", "WFE_CODE_SCAN_GITLEAKS_ENABLED", FieldKind::Bool, "true",
        "Enable/Disable gitleaks in the code scan pipeline"),
    ("CodeScanGitleaksFilename", "gitleaks-filename", "WFE_CODE_SCAN_GITLEAKS_FILENAME", FieldKind::String, "secrets-report.gitleaks.json",
        "The filename for the gitleaks secret report - must contain 'gitleaks'"),
    ("CodeScanGitleaksSrcDir", "gitleaks-src-dir", "WFE_CODE_SCAN_GITLEAKS_SRC_DIR", FieldKind::String, ".",
        "The target directory for the gitleaks scan"),
    ("CodeScanSemgrepEnabled", "semgrep-enabled", "WFE_CODE_SCAN_SEMGREP_ENABLED", FieldKind::Bool, "true",
        "Enable/Disable semgrep in the code scan pipeline"),
    ("CodeScanSemgrepFilename", "semgrep-filename", "WFE_CODE_SCAN_SEMGREP_FILENAME", FieldKind::String, "code-scan-report.semgrep.json",
        "The filename for the semgrep SAST report - must contain 'semgrep'"),
    ("CodeScanSemgrepRules", "semgrep-rules", "WFE_CODE_SCAN_SEMGREP_RULES", FieldKind::String, "p/default",
        "Semgrep ruleset manual override"),
    ("CodeScanSemgrepExperimental", "semgrep-experimental", "WFE_CODE_SCAN_SEMGREP_EXPERIMENTAL", FieldKind::Bool, "false",
        "Use the osemgrep experimental engine"),

    ("ImagePublishEnabled", "publish-enabled", "WFE_IMAGE_PUBLISH_ENABLED", FieldKind::Bool, "true",
        "Enable/Disable the image publish pipeline"),
    ("ImagePublishTagArgument", "push-tag-argument", "WFE_IMAGE_PUBLISH_TAG_ARGUMENT", FieldKind::Bool, "false",
        "Pass the image tag to the push command as a positional argument"),
    ("ImagePublishBundleEnabled", "bundle-publish-enabled", "WFE_IMAGE_PUBLISH_BUNDLE_ENABLED", FieldKind::Bool, "true",
        "Enable/Disable gatecheck artifact bundle publish"),
    ("ImagePublishBundleTag", "bundle-tag", "WFE_IMAGE_PUBLISH_BUNDLE_TAG", FieldKind::String, "my-app/artifact-bundle:latest",
        "The full image tag for the target gatecheck bundle image blob"),
    ("ImagePublishArtifactPaths", "bundle-files", "WFE_IMAGE_PUBLISH_ARTIFACT_PATHS", FieldKind::List, "",
        "Comma separated files to add to the bundle, defaults to every report in the artifact directory"),

    ("DeployEnabled", "validate-enabled", "WFE_DEPLOY_ENABLED", FieldKind::Bool, "true",
        "Enable/Disable the deploy pipeline"),
    ("DeployGatecheckConfigFilename", "gatecheck-config", "WFE_DEPLOY_GATECHECK_CONFIG_FILENAME", FieldKind::String, "",
        "The filename for the gatecheck config used during validation"),
];

/// Every tunable of the workflow engine, keyed by binding tag.
#[derive(Debug, Clone)]
pub struct MetaConfig {
    fields: IndexMap<&'static str, MetaField>,
}

impl MetaConfig {
    /// Build the full catalog. Fails only if a built-in default does not decode.
    pub fn new() -> Result<Self> {
        let mut fields = IndexMap::with_capacity(FIELDS.len());
        for &(name, flag, env_key, kind, default, description) in FIELDS {
            let field = MetaField::new(name, flag, env_key, kind, default, description)?;
            fields.insert(name, field);
        }
        Ok(Self { fields })
    }

    pub fn get(&self, name: &str) -> Option<&MetaField> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut MetaField> {
        self.fields.get_mut(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &MetaField> {
        self.fields.values()
    }

    pub fn fields_mut(&mut self) -> impl Iterator<Item = &mut MetaField> {
        self.fields.values_mut()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field by its long flag name.
    pub fn by_flag_mut(&mut self, flag: &str) -> Option<&mut MetaField> {
        self.fields.values_mut().find(|f| f.flag == flag)
    }

    /// Evaluate the named field.
    pub fn evaluate(&self, name: &str, env: &dyn Environment) -> Result<Value> {
        self.get(name)
            .ok_or_else(|| PipelineError::Configuration(format!("unknown field: {name}")))?
            .evaluate(env)
    }
}
