use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `COHORT_COMPILER__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub compiler: CompilerConfig,
    #[serde(default)]
    pub data: DataConfig,
}

/// Constants baked into the compiled condition trees.
#[derive(Debug, Clone, Deserialize)]
pub struct CompilerConfig {
    /// Destination hosts a LinkClick must point at.
    #[serde(default = "default_link_click_destinations")]
    pub link_click_destinations: Vec<String>,
    #[serde(default = "default_engaged_time_seconds")]
    pub engaged_time_seconds: u32,
    #[serde(default = "default_engaged_completion_ratio")]
    pub engaged_completion_ratio: f64,
    /// Ad-server targeting key carrying the platform's segment codes.
    #[serde(default = "default_slot_targeting_key")]
    pub slot_targeting_key: String,
    #[serde(default = "default_tags")]
    pub default_tags: Vec<String>,
    #[serde(default = "default_market")]
    pub default_market: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataConfig {
    /// Root folder holding `query/*.json` definition files.
    #[serde(default)]
    pub data_path: Option<String>,
}

// Default functions
fn default_link_click_destinations() -> Vec<String> {
    vec![
        "facebook.com".to_string(),
        "instagram.com".to_string(),
        "pinterest.com".to_string(),
    ]
}
fn default_engaged_time_seconds() -> u32 {
    30
}
fn default_engaged_completion_ratio() -> f64 {
    0.6
}
fn default_slot_targeting_key() -> String {
    "permutive".to_string()
}
fn default_tags() -> Vec<String> {
    vec!["#automatic".to_string(), "#spireglobal".to_string()]
}
fn default_market() -> String {
    "CN".to_string()
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            link_click_destinations: default_link_click_destinations(),
            engaged_time_seconds: default_engaged_time_seconds(),
            engaged_completion_ratio: default_engaged_completion_ratio(),
            slot_targeting_key: default_slot_targeting_key(),
            default_tags: default_tags(),
            default_market: default_market(),
        }
    }
}

impl CompilerConfig {
    /// Reject settings that would compile into conditions the matching
    /// engine can never satisfy.
    pub fn validate(&self) -> Result<(), crate::CohortError> {
        if self.link_click_destinations.iter().all(|d| d.trim().is_empty()) {
            return Err(crate::CohortError::Config(
                "link_click_destinations must name at least one host".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.engaged_completion_ratio) {
            return Err(crate::CohortError::Config(format!(
                "engaged_completion_ratio must be within 0..=1, got {}",
                self.engaged_completion_ratio
            )));
        }
        if self.slot_targeting_key.trim().is_empty() {
            return Err(crate::CohortError::Config(
                "slot_targeting_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from environment variables. Unset keys take
    /// their defaults; an invalid value is an error.
    pub fn load() -> Result<Self, crate::CohortError> {
        Self::load_from(None)
    }

    /// Load from `vars` in place of the process environment when given.
    pub fn load_from(
        vars: Option<config::Map<String, String>>,
    ) -> Result<Self, crate::CohortError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("COHORT_COMPILER")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("compiler.link_click_destinations")
                .with_list_parse_key("compiler.default_tags")
                .source(vars),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.compiler.validate()?;
        tracing::debug!(
            destinations = config.compiler.link_click_destinations.len(),
            market = %config.compiler.default_market,
            "Compiler configuration loaded"
        );
        Ok(config)
    }
}
