//! Stage specifications.

use crate::core::{ResultSlot, StageId};
use crate::errors::{ContractErrorInfo, PipelineValidationError};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// What a stage asks the service to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOperation {
    /// Upload the raw dataset under the stage's output name.
    Ingest,
    /// Apply an instruction to named input objects.
    Apply {
        /// Natural-language instruction with `{object}` placeholders.
        instruction: String,
        /// Object names the instruction reads.
        inputs: Vec<String>,
    },
}

/// Specification for a single stage in a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    /// The stage identity.
    pub id: StageId,
    /// The remote call this stage makes.
    pub operation: StageOperation,
    /// The remote object this stage creates.
    pub output: String,
    /// Where the output is kept locally, if it is fetched back.
    pub retain: Option<ResultSlot>,
    /// Stages producing this stage's inputs. Filled in by the builder.
    pub dependencies: BTreeSet<StageId>,
}

impl StageSpec {
    /// A stage that uploads the dataset as `output`.
    #[must_use]
    pub fn ingest(id: StageId, output: impl Into<String>) -> Self {
        Self {
            id,
            operation: StageOperation::Ingest,
            output: output.into(),
            retain: None,
            dependencies: BTreeSet::new(),
        }
    }

    /// A stage applying `instruction` and writing `output`.
    #[must_use]
    pub fn apply(id: StageId, output: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            id,
            operation: StageOperation::Apply {
                instruction: instruction.into(),
                inputs: Vec::new(),
            },
            output: output.into(),
            retain: None,
            dependencies: BTreeSet::new(),
        }
    }

    /// Sets the input objects of an apply stage.
    #[must_use]
    pub fn with_inputs(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        if let StageOperation::Apply { inputs, .. } = &mut self.operation {
            *inputs = names.into_iter().map(Into::into).collect();
        }
        self
    }

    /// Keeps the stage output locally in `slot`.
    #[must_use]
    pub fn retained(mut self, slot: ResultSlot) -> Self {
        self.retain = Some(slot);
        self
    }

    /// Object names this stage reads.
    #[must_use]
    pub fn inputs(&self) -> &[String] {
        match &self.operation {
            StageOperation::Ingest => &[],
            StageOperation::Apply { inputs, .. } => inputs,
        }
    }

    /// Placeholder names used in the instruction, in order of appearance.
    #[must_use]
    pub fn placeholders(&self) -> Vec<String> {
        match &self.operation {
            StageOperation::Ingest => Vec::new(),
            StageOperation::Apply { instruction, .. } => {
                let mut seen = Vec::new();
                for cap in placeholder_regex().captures_iter(instruction) {
                    let name = cap[1].to_string();
                    if !seen.contains(&name) {
                        seen.push(name);
                    }
                }
                seen
            }
        }
    }

    /// Validates the stage specification on its own.
    ///
    /// # Errors
    ///
    /// Returns an error if an apply stage has no inputs, reads its own
    /// output, or uses a placeholder that is not one of its inputs.
    pub fn validate(&self) -> Result<(), PipelineValidationError> {
        if self.output.trim().is_empty() {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' has an empty output object name",
                self.id
            ))
            .with_stages(vec![self.id]));
        }

        let StageOperation::Apply { inputs, .. } = &self.operation else {
            return Ok(());
        };

        if inputs.is_empty() {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' applies an instruction without inputs",
                self.id
            ))
            .with_stages(vec![self.id]));
        }

        if inputs.contains(&self.output) {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' cannot read its own output '{}'",
                self.id, self.output
            ))
            .with_stages(vec![self.id]));
        }

        for name in self.placeholders() {
            if !inputs.contains(&name) {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' instruction references '{{{name}}}' which is not one of its inputs",
                    self.id
                ))
                .with_stages(vec![self.id])
                .with_error_info(
                    ContractErrorInfo::new(
                        "PIPELINE-UNDECLARED-PLACEHOLDER",
                        format!("Placeholder '{name}' is not a declared input"),
                    )
                    .with_fix_hint("Add the object to the stage inputs or remove the placeholder.")
                    .with_context_entry("stage", self.id.as_str()),
                ));
            }
        }

        Ok(())
    }
}

#[allow(clippy::expect_used)]
fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_stage_creation() {
        let spec = StageSpec::apply(StageId::Sentiment, "sentiment_analysis", "Rate {support_tickets}")
            .with_inputs(["support_tickets"]);

        assert_eq!(spec.inputs(), ["support_tickets".to_string()]);
        assert_eq!(spec.placeholders(), vec!["support_tickets".to_string()]);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_ingest_has_no_inputs() {
        let spec = StageSpec::ingest(StageId::Ingestion, "support_tickets").with_inputs(["x"]);
        assert!(spec.inputs().is_empty());
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_undeclared_placeholder() {
        let spec = StageSpec::apply(
            StageId::Escalation,
            "escalation_risk",
            "Use {support_tickets} and {sentiment_analysis}",
        )
        .with_inputs(["support_tickets"]);

        let err = spec.validate().unwrap_err();
        assert_eq!(err.code(), Some("PIPELINE-UNDECLARED-PLACEHOLDER"));
        assert_eq!(err.stages, vec![StageId::Escalation]);
    }

    #[test]
    fn test_self_input_rejected() {
        let spec = StageSpec::apply(StageId::Summary, "executive_summary", "x")
            .with_inputs(["executive_summary"]);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_apply_without_inputs_rejected() {
        let spec = StageSpec::apply(StageId::Summary, "executive_summary", "x");
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_placeholders_deduplicated() {
        let spec = StageSpec::apply(StageId::Summary, "s", "{a} then {b} then {a} and {not a name}")
            .with_inputs(["a", "b"]);
        assert_eq!(spec.placeholders(), vec!["a".to_string(), "b".to_string()]);
    }
}
