use serde::{Deserialize, Serialize};

/// Layout lifecycle notifications surfaced to the host UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GraphEvent {
    #[serde(rename = "layout:started")]
    LayoutStarted { name: String },
    #[serde(rename = "layout:stopped")]
    LayoutStopped { name: String },
    #[serde(rename = "layout:error")]
    LayoutError { error: String },
    #[serde(rename = "layout:adapted")]
    LayoutAdapted {
        from: String,
        to: String,
        reason: String,
    },
}

impl GraphEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GraphEvent::LayoutStarted { .. } => "layout:started",
            GraphEvent::LayoutStopped { .. } => "layout:stopped",
            GraphEvent::LayoutError { .. } => "layout:error",
            GraphEvent::LayoutAdapted { .. } => "layout:adapted",
        }
    }
}
