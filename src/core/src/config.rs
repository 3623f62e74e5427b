use serde::{Deserialize, Serialize};

use crate::meta::{FieldKind, Value};

/// Current config file schema version
pub const CONFIG_VERSION: &str = "1";

/// Mutable access to one bound leaf of the config record.
pub enum LeafMut<'a> {
    String(&'a mut String),
    Bool(&'a mut bool),
    Int(&'a mut i64),
    List(&'a mut Vec<String>),
}

impl LeafMut<'_> {
    pub fn kind(&self) -> FieldKind {
        match self {
            LeafMut::String(_) => FieldKind::String,
            LeafMut::Bool(_) => FieldKind::Bool,
            LeafMut::Int(_) => FieldKind::Int,
            LeafMut::List(_) => FieldKind::List,
        }
    }

    /// Current value of the leaf.
    pub fn get(&self) -> Value {
        match self {
            LeafMut::String(s) => Value::String((**s).clone()),
            LeafMut::Bool(b) => Value::Bool(**b),
            LeafMut::Int(i) => Value::Int(**i),
            LeafMut::List(l) => Value::List((**l).clone()),
        }
    }

    /// Assign `value`. Returns `false` when the kinds differ.
    pub fn set(&mut self, value: Value) -> bool {
        match (self, value) {
            (LeafMut::String(slot), Value::String(v)) => **slot = v,
            (LeafMut::Bool(slot), Value::Bool(v)) => **slot = v,
            (LeafMut::Int(slot), Value::Int(v)) => **slot = v,
            (LeafMut::List(slot), Value::List(v)) => **slot = v,
            _ => return false,
        }
        true
    }
}

/// Receives every bound leaf of a config record, depth first.
pub trait ConfigVisitor {
    fn leaf(&mut self, tag: &str, leaf: LeafMut<'_>);
}

/// A record whose bound leaves can be walked by a [`ConfigVisitor`].
pub trait Bind {
    fn visit(&mut self, visitor: &mut dyn ConfigVisitor);
}

/// Workflow engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Schema version (not bound to any field)
    pub version: String,

    /// Full image tag for the target container image
    pub image_tag: String,

    /// Directory for all generated artifacts
    pub artifact_dir: String,

    /// Filename of the gatecheck bundle
    pub gatecheck_bundle_filename: String,

    /// Container CLI: docker, podman or bake
    pub cli_interface: String,

    pub image_build: ImageBuildConfig,
    pub image_scan: ImageScanConfig,
    pub code_scan: CodeScanConfig,
    pub image_publish: ImagePublishConfig,
    pub deploy: DeployConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            image_tag: "my-app:latest".to_string(),
            artifact_dir: "artifacts".to_string(),
            gatecheck_bundle_filename: "gatecheck-bundle.tar.gz".to_string(),
            cli_interface: "docker".to_string(),
            image_build: ImageBuildConfig::default(),
            image_scan: ImageScanConfig::default(),
            code_scan: CodeScanConfig::default(),
            image_publish: ImagePublishConfig::default(),
            deploy: DeployConfig::default(),
        }
    }
}

impl Bind for Config {
    fn visit(&mut self, v: &mut dyn ConfigVisitor) {
        v.leaf("ImageTag", LeafMut::String(&mut self.image_tag));
        v.leaf("ArtifactDir", LeafMut::String(&mut self.artifact_dir));
        v.leaf(
            "GatecheckBundleFilename",
            LeafMut::String(&mut self.gatecheck_bundle_filename),
        );
        v.leaf("CliInterface", LeafMut::String(&mut self.cli_interface));
        self.image_build.visit(v);
        self.image_scan.visit(v);
        self.code_scan.visit(v);
        self.image_publish.visit(v);
        self.deploy.visit(v);
    }
}

/// Image build configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageBuildConfig {
    pub enabled: bool,
    pub build_dir: String,
    pub dockerfile: String,
    /// Build arguments as a JSON object string
    pub args: String,
    pub platform: String,
    pub target: String,
    pub cache_to: String,
    pub cache_from: String,
    pub squash_layers: bool,
    pub bakefile: String,
    pub bake_target: String,
    pub tar_filename: String,
    /// Seconds between archive size reports while saving (0 = off)
    pub save_progress_interval: i64,
}

impl Default for ImageBuildConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            build_dir: ".".to_string(),
            dockerfile: "Dockerfile".to_string(),
            args: String::new(),
            platform: String::new(),
            target: String::new(),
            cache_to: String::new(),
            cache_from: String::new(),
            squash_layers: false,
            bakefile: "docker-bake.hcl".to_string(),
            bake_target: "default".to_string(),
            tar_filename: "image.tar".to_string(),
            save_progress_interval: 5,
        }
    }
}

impl Bind for ImageBuildConfig {
    fn visit(&mut self, v: &mut dyn ConfigVisitor) {
        v.leaf("ImageBuildEnabled", LeafMut::Bool(&mut self.enabled));
        v.leaf("ImageBuildDir", LeafMut::String(&mut self.build_dir));
        v.leaf("ImageBuildDockerfile", LeafMut::String(&mut self.dockerfile));
        v.leaf("ImageBuildArgs", LeafMut::String(&mut self.args));
        v.leaf("ImageBuildPlatform", LeafMut::String(&mut self.platform));
        v.leaf("ImageBuildTarget", LeafMut::String(&mut self.target));
        v.leaf("ImageBuildCacheTo", LeafMut::String(&mut self.cache_to));
        v.leaf("ImageBuildCacheFrom", LeafMut::String(&mut self.cache_from));
        v.leaf("ImageBuildSquashLayers", LeafMut::Bool(&mut self.squash_layers));
        v.leaf("ImageBuildBakefile", LeafMut::String(&mut self.bakefile));
        v.leaf("ImageBuildBakeTarget", LeafMut::String(&mut self.bake_target));
        v.leaf("ImageBuildTarFilename", LeafMut::String(&mut self.tar_filename));
        v.leaf(
            "ImageBuildSaveProgressInterval",
            LeafMut::Int(&mut self.save_progress_interval),
        );
    }
}

/// Image scan configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageScanConfig {
    pub enabled: bool,
    pub syft_filename: String,
    pub grype_filename: String,
    pub clamav_enabled: bool,
    pub clamav_filename: String,
    pub clamav_target: String,
    pub freshclam_disabled: bool,
}

impl Default for ImageScanConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            syft_filename: "sbom-report.syft.json".to_string(),
            grype_filename: "image-vulnerability-report.grype.json".to_string(),
            clamav_enabled: true,
            clamav_filename: "virus-report.clamav.txt".to_string(),
            clamav_target: String::new(),
            freshclam_disabled: false,
        }
    }
}

impl Bind for ImageScanConfig {
    fn visit(&mut self, v: &mut dyn ConfigVisitor) {
        v.leaf("ImageScanEnabled", LeafMut::Bool(&mut self.enabled));
        v.leaf("ImageScanSyftFilename", LeafMut::String(&mut self.syft_filename));
        v.leaf("ImageScanGrypeFilename", LeafMut::String(&mut self.grype_filename));
        v.leaf("ImageScanClamavEnabled", LeafMut::Bool(&mut self.clamav_enabled));
        v.leaf("ImageScanClamavFilename", LeafMut::String(&mut self.clamav_filename));
        v.leaf("ImageScanClamavTarget", LeafMut::String(&mut self.clamav_target));
        v.leaf(
            "ImageScanFreshclamDisabled",
            LeafMut::Bool(&mut self.freshclam_disabled),
        );
    }
}

/// Source code scan configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeScanConfig {
    pub enabled: bool,
    pub gitleaks_enabled: bool,
    pub gitleaks_filename: String,
    pub gitleaks_src_dir: String,
    pub semgrep_enabled: bool,
    pub semgrep_filename: String,
    pub semgrep_rules: String,
    pub semgrep_experimental: bool,
}

impl Default for CodeScanConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            gitleaks_enabled: true,
            gitleaks_filename: "secrets-report.gitleaks.json".to_string(),
            gitleaks_src_dir: ".".to_string(),
            semgrep_enabled: true,
            semgrep_filename: "code-scan-report.semgrep.json".to_string(),
            semgrep_rules: "p/default".to_string(),
            semgrep_experimental: false,
        }
    }
}

impl Bind for CodeScanConfig {
    fn visit(&mut self, v: &mut dyn ConfigVisitor) {
        v.leaf("CodeScanEnabled", LeafMut::Bool(&mut self.enabled));
        v.leaf("CodeScanGitleaksEnabled", LeafMut::Bool(&mut self.gitleaks_enabled));
        v.leaf(
            "CodeScanGitleaksFilename",
            LeafMut::String(&mut self.gitleaks_filename),
        );
        v.leaf("CodeScanGitleaksSrcDir", LeafMut::String(&mut self.gitleaks_src_dir));
        v.leaf("CodeScanSemgrepEnabled", LeafMut::Bool(&mut self.semgrep_enabled));
        v.leaf("CodeScanSemgrepFilename", LeafMut::String(&mut self.semgrep_filename));
        v.leaf("CodeScanSemgrepRules", LeafMut::String(&mut self.semgrep_rules));
        v.leaf(
            "CodeScanSemgrepExperimental",
            LeafMut::Bool(&mut self.semgrep_experimental),
        );
    }
}

/// Image and bundle publish configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImagePublishConfig {
    pub enabled: bool,
    /// Pass the image tag to `push` positionally
    pub tag_argument: bool,
    pub bundle_enabled: bool,
    pub bundle_tag: String,
    /// Files to bundle; empty means every known report
    pub artifact_paths: Vec<String>,
}

impl Default for ImagePublishConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tag_argument: false,
            bundle_enabled: true,
            bundle_tag: "my-app/artifact-bundle:latest".to_string(),
            artifact_paths: Vec::new(),
        }
    }
}

impl Bind for ImagePublishConfig {
    fn visit(&mut self, v: &mut dyn ConfigVisitor) {
        v.leaf("ImagePublishEnabled", LeafMut::Bool(&mut self.enabled));
        v.leaf("ImagePublishTagArgument", LeafMut::Bool(&mut self.tag_argument));
        v.leaf("ImagePublishBundleEnabled", LeafMut::Bool(&mut self.bundle_enabled));
        v.leaf("ImagePublishBundleTag", LeafMut::String(&mut self.bundle_tag));
        v.leaf(
            "ImagePublishArtifactPaths",
            LeafMut::List(&mut self.artifact_paths),
        );
    }
}

/// Validation (deploy) configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeployConfig {
    pub enabled: bool,
    pub gatecheck_config_filename: String,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            gatecheck_config_filename: String::new(),
        }
    }
}

impl Bind for DeployConfig {
    fn visit(&mut self, v: &mut dyn ConfigVisitor) {
        v.leaf("DeployEnabled", LeafMut::Bool(&mut self.enabled));
        v.leaf(
            "DeployGatecheckConfigFilename",
            LeafMut::String(&mut self.gatecheck_config_filename),
        );
    }
}

/// Collects `(tag, value)` pairs for every bound leaf.
#[derive(Debug, Default)]
pub struct LeafCollector {
    pub leaves: Vec<(String, Value)>,
}

impl ConfigVisitor for LeafCollector {
    fn leaf(&mut self, tag: &str, leaf: LeafMut<'_>) {
        self.leaves.push((tag.to_string(), leaf.get()));
    }
}

impl Config {
    /// Every bound leaf with its current value, in declaration order.
    pub fn leaves(&self) -> Vec<(String, Value)> {
        let mut copy = self.clone();
        let mut collector = LeafCollector::default();
        copy.visit(&mut collector);
        collector.leaves
    }
}
