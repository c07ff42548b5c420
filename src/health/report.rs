use std::fmt;
use std::time::Duration;

/// Outcome of one readiness check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckResult {
    /// Check name (component name unless configured).
    pub name: String,
    /// Id of the service behind the check.
    pub service: String,
    /// `None` when the check passed, otherwise the failure message.
    pub error: Option<String>,
    /// True when a failure of this check does not fail the report.
    pub skip_on_err: bool,
    /// How long the check took.
    pub elapsed: Duration,
}

impl CheckResult {
    /// True if the check passed.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregated readiness report.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HealthReport {
    /// Individual check results, sorted by name.
    pub checks: Vec<CheckResult>,
}

impl HealthReport {
    /// True when every check passed or is allowed to fail.
    pub fn is_ok(&self) -> bool {
        self.checks.iter().all(|c| c.is_ok() || c.skip_on_err)
    }

    /// Returns the checks that failed.
    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.is_ok())
    }

    /// Returns the result of the check named `name`.
    pub fn get(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if self.is_ok() { "ok" } else { "unavailable" })?;
        for check in &self.checks {
            match &check.error {
                None => write!(f, "\n{}: ok", check.name)?,
                Some(err) if check.skip_on_err => write!(f, "\n{}: {err} (skipped)", check.name)?,
                Some(err) => write!(f, "\n{}: {err}", check.name)?,
            }
        }
        Ok(())
    }
}
