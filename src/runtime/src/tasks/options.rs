//! Per-task options derived from the resolved [`Config`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use wfe_core::Config;

/// Options for `image-build`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageBuildOptions {
    /// Image tag passed as `--tag` when non-empty.
    pub tag: String,
    pub dockerfile: String,
    pub context: String,
    /// JSON object of build arguments, e.g. `{"VERSION":"1.2"}`.
    pub build_args: String,
    pub platform: String,
    pub target: String,
    pub cache_to: String,
    pub cache_from: String,
    pub squash_layers: bool,
    pub bakefile: String,
    pub bake_target: String,
}

/// Flat option record every task is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOptions {
    pub image_name: String,
    pub artifact_dir: PathBuf,
    pub cli_interface: String,

    pub build: ImageBuildOptions,

    pub image_tar_filename: String,
    pub save_progress_interval: Duration,

    pub sbom_filename: String,
    pub grype_filename: String,

    pub clamav_filename: String,
    pub clamav_target: String,
    pub freshclam_disabled: bool,

    pub gitleaks_enabled: bool,
    pub gitleaks_filename: String,
    pub gitleaks_src_dir: String,

    pub semgrep_enabled: bool,
    pub semgrep_filename: String,
    pub semgrep_rules: String,
    pub semgrep_experimental: bool,

    pub push_tag_argument: bool,
    pub bundle_filename: String,
    pub bundle_files: Vec<String>,
    pub bundle_tag: String,

    pub gatecheck_config_filename: String,
}

impl TaskOptions {
    pub fn from_config(config: &Config) -> Self {
        let build = &config.image_build;
        let scan = &config.image_scan;
        let code = &config.code_scan;
        let publish = &config.image_publish;

        Self {
            image_name: config.image_tag.clone(),
            artifact_dir: PathBuf::from(&config.artifact_dir),
            cli_interface: config.cli_interface.clone(),
            build: ImageBuildOptions {
                tag: config.image_tag.clone(),
                dockerfile: build.dockerfile.clone(),
                context: build.build_dir.clone(),
                build_args: build.args.clone(),
                platform: build.platform.clone(),
                target: build.target.clone(),
                cache_to: build.cache_to.clone(),
                cache_from: build.cache_from.clone(),
                squash_layers: build.squash_layers,
                bakefile: build.bakefile.clone(),
                bake_target: build.bake_target.clone(),
            },
            image_tar_filename: build.tar_filename.clone(),
            save_progress_interval: Duration::from_secs(
                u64::try_from(build.save_progress_interval).unwrap_or(0),
            ),
            sbom_filename: scan.syft_filename.clone(),
            grype_filename: scan.grype_filename.clone(),
            clamav_filename: scan.clamav_filename.clone(),
            clamav_target: scan.clamav_target.clone(),
            freshclam_disabled: scan.freshclam_disabled,
            gitleaks_enabled: code.gitleaks_enabled,
            gitleaks_filename: code.gitleaks_filename.clone(),
            gitleaks_src_dir: code.gitleaks_src_dir.clone(),
            semgrep_enabled: code.semgrep_enabled,
            semgrep_filename: code.semgrep_filename.clone(),
            semgrep_rules: code.semgrep_rules.clone(),
            semgrep_experimental: code.semgrep_experimental,
            push_tag_argument: publish.tag_argument,
            bundle_filename: config.gatecheck_bundle_filename.clone(),
            bundle_files: publish.artifact_paths.clone(),
            bundle_tag: publish.bundle_tag.clone(),
            gatecheck_config_filename: config.deploy.gatecheck_config_filename.clone(),
        }
    }

    /// `<artifactDir>/<filename>`, or empty when either part is empty.
    pub fn artifact_path(&self, filename: &str) -> PathBuf {
        if filename.trim().is_empty() || self.artifact_dir.as_os_str().is_empty() {
            return PathBuf::new();
        }
        self.artifact_dir.join(filename)
    }

    /// Target of the antivirus scan: the configured target, else the saved image tar.
    pub fn clamav_scan_target(&self) -> PathBuf {
        if self.clamav_target.trim().is_empty() {
            self.artifact_path(&self.image_tar_filename)
        } else {
            PathBuf::from(&self.clamav_target)
        }
    }

    /// Reports bundled when no explicit file list is configured, in bundling order.
    pub fn default_bundle_files(&self) -> Vec<PathBuf> {
        [
            &self.grype_filename,
            &self.sbom_filename,
            &self.clamav_filename,
            &self.semgrep_filename,
            &self.gitleaks_filename,
        ]
        .into_iter()
        .map(|f| self.artifact_path(f))
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
    }
}

/// Path rendered for command lines.
pub(crate) fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
