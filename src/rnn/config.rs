use serde::{Deserialize, Serialize};

/// Flags controlling how a step function is driven across time.
///
/// Serializable so that recurrent layers can store it in their config.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RnnConfig {
    /// Process the sequence from the last timestep to the first.
    pub go_backwards: bool,
    /// Expand the loop into one host-level call per timestep.
    pub unroll: bool,
    /// Inputs are `[time, batch, ...]` instead of `[batch, time, ...]`.
    pub time_major: bool,
    /// Masked positions produce zeros instead of carrying the previous output.
    pub zero_output_for_mask: bool,
    /// Keep every step's output, or only the last one.
    pub return_all_outputs: bool,
}

impl Default for RnnConfig {
    fn default() -> Self {
        Self {
            go_backwards: false,
            unroll: false,
            time_major: false,
            zero_output_for_mask: false,
            return_all_outputs: true,
        }
    }
}

impl RnnConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_go_backwards(mut self, go_backwards: bool) -> Self {
        self.go_backwards = go_backwards;
        self
    }

    pub fn with_unroll(mut self, unroll: bool) -> Self {
        self.unroll = unroll;
        self
    }

    pub fn with_time_major(mut self, time_major: bool) -> Self {
        self.time_major = time_major;
        self
    }

    pub fn with_zero_output_for_mask(mut self, zero_output_for_mask: bool) -> Self {
        self.zero_output_for_mask = zero_output_for_mask;
        self
    }

    pub fn with_return_all_outputs(mut self, return_all_outputs: bool) -> Self {
        self.return_all_outputs = return_all_outputs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RnnConfig::default();
        assert!(!config.go_backwards);
        assert!(!config.unroll);
        assert!(!config.time_major);
        assert!(!config.zero_output_for_mask);
        assert!(config.return_all_outputs);
    }

    #[test]
    fn test_json_missing_fields_use_defaults() {
        let config: RnnConfig = serde_json::from_str(r#"{"unroll": true}"#).unwrap();
        assert!(config.unroll);
        assert!(config.return_all_outputs);

        let json = serde_json::to_string(&config.with_time_major(true)).unwrap();
        let back: RnnConfig = serde_json::from_str(&json).unwrap();
        assert!(back.time_major && back.unroll);
    }
}
