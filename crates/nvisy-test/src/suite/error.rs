//! Conformance failure reporting.

/// Result type returned by the conformance scenarios.
pub type SuiteResult<T = ()> = std::result::Result<T, SuiteError>;

/// A failed conformance scenario.
#[derive(Debug, thiserror::Error)]
#[error("storage scenario '{scenario}' failed: {reason}")]
pub struct SuiteError {
    /// Name of the failing scenario.
    pub scenario: &'static str,
    /// What the scenario observed.
    pub reason: String,
    /// The storage error that caused the failure, if any.
    #[source]
    pub source: Option<nvisy_storage::Error>,
}

impl SuiteError {
    /// Creates a failure without an underlying storage error.
    pub fn new(scenario: &'static str, reason: impl Into<String>) -> Self {
        Self {
            scenario,
            reason: reason.into(),
            source: None,
        }
    }

    /// Attaches the storage error that caused the failure.
    pub fn with_source(mut self, source: nvisy_storage::Error) -> Self {
        self.source = Some(source);
        self
    }
}

/// Attaches scenario context to storage results.
pub(crate) trait ScenarioContext<T> {
    fn during(self, scenario: &'static str, step: &str) -> SuiteResult<T>;
}

impl<T> ScenarioContext<T> for nvisy_storage::Result<T> {
    fn during(self, scenario: &'static str, step: &str) -> SuiteResult<T> {
        self.map_err(|error| {
            SuiteError::new(scenario, format!("{step}: {error}")).with_source(error)
        })
    }
}

/// Fails `scenario` with `reason` unless `condition` holds.
pub(crate) fn ensure(
    scenario: &'static str,
    condition: bool,
    reason: impl FnOnce() -> String,
) -> SuiteResult {
    if condition {
        Ok(())
    } else {
        Err(SuiteError::new(scenario, reason()))
    }
}
