use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_sequence_replacement() -> String {
    "uuid()".to_string()
}

fn default_storage_format() -> String {
    "DELTA".to_string()
}

fn default_bare_number_precision() -> u32 {
    38
}

/// Everything a conversion run can be tuned with. Rule order is not
/// configurable; the pipeline section only switches rules on and off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Which standard rules run
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Type mapping defaults
    #[serde(default)]
    pub types: TypeMappingConfig,
    /// Expression that replaces `seq.NEXTVAL`
    #[serde(default = "default_sequence_replacement")]
    pub sequence_replacement: String,
    /// Storage format suggested for CREATE TABLE statements
    #[serde(default = "default_storage_format")]
    pub storage_format: String,
    /// Extra regex rules, run after the standard rules and before the banner
    #[serde(default)]
    pub custom_rules: Vec<CustomRuleConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Rules to switch on or off, by name. Rules not listed stay enabled.
    #[serde(default)]
    pub rules: Vec<RuleToggle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleToggle {
    /// Name of the rule
    pub name: String,
    /// Whether this rule is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMappingConfig {
    /// Precision used for a bare `NUMBER`
    #[serde(default = "default_bare_number_precision")]
    pub bare_number_precision: u32,
    /// Scale used for a bare `NUMBER`
    #[serde(default)]
    pub bare_number_scale: u32,
}

impl Default for TypeMappingConfig {
    fn default() -> Self {
        Self {
            bare_number_precision: default_bare_number_precision(),
            bare_number_scale: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomRuleConfig {
    /// Unique rule name, shown in the trace and in review markers
    pub name: String,
    /// Regex to match (use `(?i)` for keywords)
    pub pattern: String,
    /// Replacement text; `$1` / `${name}` expand capture groups
    pub replacement: String,
    /// When set, every rewrite is flagged for review with this reason
    #[serde(default)]
    pub review: Option<String>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            types: TypeMappingConfig::default(),
            sequence_replacement: default_sequence_replacement(),
            storage_format: default_storage_format(),
            custom_rules: Vec::new(),
        }
    }
}

impl ConverterConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: ConverterConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Defaults when no path is given. A path that cannot be read or parsed
    /// is an error, never a silent fall back to defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p)
                .with_context(|| format!("failed to load config from {p}")),
            None => Ok(Self::default()),
        }
    }

    /// Whether the pipeline section leaves `rule_name` enabled
    pub fn is_rule_enabled(&self, rule_name: &str) -> bool {
        self.pipeline
            .rules
            .iter()
            .rev()
            .find(|toggle| toggle.name == rule_name)
            .map(|toggle| toggle.enabled)
            .unwrap_or(true)
    }
}
