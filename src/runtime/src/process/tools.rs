//! External tool locations.

use wfe_core::Environment;

/// Prefix of the per-tool override variables, e.g. `WFE_TOOL_GRYPE`.
pub const TOOL_ENV_PREFIX: &str = "WFE_TOOL_";

/// Program names (or paths) of every external tool a task may start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub docker: String,
    pub podman: String,
    pub syft: String,
    pub grype: String,
    pub freshclam: String,
    pub clamscan: String,
    pub semgrep: String,
    pub osemgrep: String,
    pub gitleaks: String,
    pub gatecheck: String,
    pub oras: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            docker: "docker".to_string(),
            podman: "podman".to_string(),
            syft: "syft".to_string(),
            grype: "grype".to_string(),
            freshclam: "freshclam".to_string(),
            clamscan: "clamscan".to_string(),
            semgrep: "semgrep".to_string(),
            osemgrep: "osemgrep".to_string(),
            gitleaks: "gitleaks".to_string(),
            gatecheck: "gatecheck".to_string(),
            oras: "oras".to_string(),
        }
    }
}

impl ToolPaths {
    /// Every tool, by name.
    pub fn entries(&self) -> [(&'static str, &str); 11] {
        [
            ("docker", &self.docker),
            ("podman", &self.podman),
            ("syft", &self.syft),
            ("grype", &self.grype),
            ("freshclam", &self.freshclam),
            ("clamscan", &self.clamscan),
            ("semgrep", &self.semgrep),
            ("osemgrep", &self.osemgrep),
            ("gitleaks", &self.gitleaks),
            ("gatecheck", &self.gatecheck),
            ("oras", &self.oras),
        ]
    }

    /// Defaults overridden by any non-empty `WFE_TOOL_<NAME>` variable.
    pub fn from_env(env: &dyn Environment) -> Self {
        let mut tools = Self::default();
        for (name, slot) in tools.slots_mut() {
            let key = format!("{TOOL_ENV_PREFIX}{}", name.to_uppercase());
            if let Some(value) = env.var(&key).filter(|v| !v.trim().is_empty()) {
                tracing::debug!(tool = name, program = %value, "Tool path overridden");
                *slot = value;
            }
        }
        tools
    }

    fn slots_mut(&mut self) -> [(&'static str, &mut String); 11] {
        [
            ("docker", &mut self.docker),
            ("podman", &mut self.podman),
            ("syft", &mut self.syft),
            ("grype", &mut self.grype),
            ("freshclam", &mut self.freshclam),
            ("clamscan", &mut self.clamscan),
            ("semgrep", &mut self.semgrep),
            ("osemgrep", &mut self.osemgrep),
            ("gitleaks", &mut self.gitleaks),
            ("gatecheck", &mut self.gatecheck),
            ("oras", &mut self.oras),
        ]
    }
}
