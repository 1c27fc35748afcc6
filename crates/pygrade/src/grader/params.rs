use serde::{Deserialize, Serialize};

/// Behavior switches of a session, group or test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Echo the prompt and the consumed line to stdout on every `input()`.
    pub verbose_inputs: bool,
    /// Keep passed assertions in the report.
    pub report_success: bool,
    /// Stop the current test at its first failed assertion.
    pub test_fail_fast: bool,
    /// Start each test from the state left by the previous one.
    pub keep_state: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            verbose_inputs: true,
            report_success: true,
            test_fail_fast: true,
            keep_state: true,
        }
    }
}

impl Params {
    /// These params with the set fields of `overrides` replaced.
    #[must_use]
    pub fn with(self, overrides: &ParamOverrides) -> Self {
        Self {
            verbose_inputs: overrides.verbose_inputs.unwrap_or(self.verbose_inputs),
            report_success: overrides.report_success.unwrap_or(self.report_success),
            test_fail_fast: overrides.test_fail_fast.unwrap_or(self.test_fail_fast),
            keep_state: overrides.keep_state.unwrap_or(self.keep_state),
        }
    }
}

/// Group- or test-level overrides, layered over the enclosing params.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamOverrides {
    pub verbose_inputs: Option<bool>,
    pub report_success: Option<bool>,
    pub test_fail_fast: Option<bool>,
    pub keep_state: Option<bool>,
}

impl ParamOverrides {
    /// Overrides that only disable fail-fast.
    #[must_use]
    pub fn no_fail_fast() -> Self {
        Self {
            test_fail_fast: Some(false),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn overrides_replace_set_fields_only() {
        let overrides = ParamOverrides {
            keep_state: Some(false),
            ..ParamOverrides::default()
        };
        let params = Params::default().with(&overrides);
        assert_eq!(
            params,
            Params {
                keep_state: false,
                ..Params::default()
            }
        );
    }

    #[test]
    fn missing_fields_default_to_true() {
        let params: Params = serde_json::from_str(r#"{"test_fail_fast": false}"#).unwrap();
        assert!(params.verbose_inputs && params.keep_state && !params.test_fail_fast);
    }
}
