use serde::{Deserialize, Serialize};

/// Metadata key whose value selects the kind of object.
pub const DEFAULT_DISCRIMINATOR_KEY: &str = "type";
/// Metadata key holding the numeric usage that gets summed.
pub const DEFAULT_ATTRIBUTE_KEY: &str = "memory_percent";

/// What to aggregate and the limit to compare against.
///
/// Set once before a run and never mutated during it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationPolicy {
    /// Discriminator value a record must carry to be counted.
    pub target_type: String,
    /// Compliance limit, in the same unit as the attribute (percent).
    pub threshold: f64,
    #[serde(default = "default_discriminator_key")]
    pub discriminator_key: String,
    #[serde(default = "default_attribute_key")]
    pub attribute_key: String,
}

fn default_discriminator_key() -> String {
    DEFAULT_DISCRIMINATOR_KEY.to_string()
}

fn default_attribute_key() -> String {
    DEFAULT_ATTRIBUTE_KEY.to_string()
}

impl AggregationPolicy {
    pub fn new(target_type: impl Into<String>, threshold: f64) -> Self {
        Self {
            target_type: target_type.into(),
            threshold,
            discriminator_key: default_discriminator_key(),
            attribute_key: default_attribute_key(),
        }
    }

    pub fn with_keys(
        mut self,
        discriminator_key: impl Into<String>,
        attribute_key: impl Into<String>,
    ) -> Self {
        self.discriminator_key = discriminator_key.into();
        self.attribute_key = attribute_key.into();
        self
    }
}
