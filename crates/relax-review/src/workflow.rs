//! Workflow step outcomes.
//!
//! The "random reviewer" step takes the reviewee as input and reports the
//! chosen reviewer as output. The workflow engine only understands a map of
//! named outputs or a failure message.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use relax_core::config::schema::TeamMember;

use crate::selector::FairnessSelector;

/// Input carrying the member who asked for a review.
pub const REVIEWEE_INPUT: &str = "mr-reviewee";

/// Output carrying the chosen reviewer's id.
pub const RANDOM_REVIEWER_OUTPUT: &str = "mr-reviewer-output";

/// Result of executing one workflow step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WorkflowOutcome {
    Success { outputs: HashMap<String, String> },
    Failure { message: String },
}

impl WorkflowOutcome {
    pub fn success<I, K, V>(outputs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        WorkflowOutcome::Success {
            outputs: outputs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        WorkflowOutcome::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WorkflowOutcome::Success { .. })
    }
}

/// Execute the "random reviewer" step.
pub async fn random_reviewer_step(
    selector: &FairnessSelector,
    team: &[TeamMember],
    inputs: &HashMap<String, String>,
) -> WorkflowOutcome {
    let Some(reviewee) = inputs.get(REVIEWEE_INPUT) else {
        return WorkflowOutcome::failure(format!("missing input: {}", REVIEWEE_INPUT));
    };

    match selector.pick_reviewer(team, reviewee).await {
        Ok((reviewer, _)) => WorkflowOutcome::success([(RANDOM_REVIEWER_OUTPUT, reviewer.id)]),
        Err(e) => {
            warn!(reviewee = %reviewee, error = %e, "random reviewer step failed");
            WorkflowOutcome::failure(e.to_string())
        }
    }
}
