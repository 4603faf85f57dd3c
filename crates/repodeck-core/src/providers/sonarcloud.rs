use repodeck_api::sonarcloud::{SonarClient, SonarCondition, SonarQualityGate};

use crate::fetch::QualitySource;
use crate::models::{GateCondition, GateState, QualityGate};
use crate::{Error, Result};

/// SonarCloud-backed quality source.
pub struct SonarProvider {
    client: SonarClient,
}

impl SonarProvider {
    pub fn new(client: SonarClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl QualitySource for SonarProvider {
    async fn gate_status(&self, project_key: &str) -> Result<Option<QualityGate>> {
        let gate = self
            .client
            .project_status(project_key)
            .await
            .map_err(|e| Error::QualityError(e.to_string()))?;

        Ok(gate.map(gate_from))
    }
}

/// Anything a gate lookup returns counts as checked, even a status we do
/// not recognize.
fn gate_from(sonar: SonarQualityGate) -> QualityGate {
    QualityGate {
        state: state_from(&sonar.status),
        conditions: sonar.conditions.into_iter().map(condition_from).collect(),
        checked: true,
    }
}

fn state_from(status: &str) -> GateState {
    match status {
        "OK" => GateState::Passed,
        "WARN" => GateState::Warning,
        "ERROR" => GateState::Failed,
        _ => GateState::Unknown,
    }
}

fn condition_from(c: SonarCondition) -> GateCondition {
    GateCondition {
        metric: c.metric_key,
        status: c.status,
        actual: c.actual_value,
    }
}
