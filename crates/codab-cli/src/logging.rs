// SPDX-License-Identifier: Apache-2.0

//! Deterministic in-memory run log. Tests assert against this instead
//! of capturing subscriber output.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Probe,
    Download,
    Checks,
    Scores,
    Publish,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunEvent {
    pub stage: RunStage,
    pub name: String,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Default, Clone)]
pub struct RunLog {
    events: Vec<RunEvent>,
}

impl RunLog {
    pub fn emit(
        &mut self,
        stage: RunStage,
        name: impl Into<String>,
        fields: BTreeMap<String, String>,
    ) {
        self.events.push(RunEvent {
            stage,
            name: name.into(),
            fields,
        });
    }

    #[must_use]
    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }
}
