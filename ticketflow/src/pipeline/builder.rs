//! Pipeline builder with validation.

use super::{prompts, StageGraph, StageSpec};
use crate::core::{ResultSlot, StageId};
use crate::errors::{ContractErrorInfo, PipelineValidationError};
use std::collections::HashMap;

/// Object name of the uploaded dataset in the default pipeline.
pub const DATASET_OBJECT: &str = "support_tickets";

/// Builder for creating validated stage graphs.
///
/// Stages must be added after the stages producing their inputs, so the
/// insertion order is always a valid execution order and no cycle can form.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    /// The pipeline name.
    name: String,
    /// Stages in insertion order.
    stages: Vec<StageSpec>,
    /// Which stage produces each object name.
    producers: HashMap<String, StageId>,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            producers: HashMap::new(),
        }
    }

    /// Adds a stage to the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails (unknown input, duplicate, etc.)
    pub fn stage(mut self, spec: StageSpec) -> Result<Self, PipelineValidationError> {
        self.add_stage_spec(spec)?;
        Ok(self)
    }

    /// Adds a stage specification, resolving its dependencies.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn add_stage_spec(&mut self, mut spec: StageSpec) -> Result<(), PipelineValidationError> {
        spec.validate()?;

        if self.stages.iter().any(|s| s.id == spec.id) {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' is defined twice",
                spec.id
            ))
            .with_stages(vec![spec.id])
            .with_error_info(ContractErrorInfo::new(
                "PIPELINE-DUPLICATE-STAGE",
                format!("Stage '{}' already exists", spec.id),
            )));
        }

        if let Some(owner) = self.producers.get(&spec.output) {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' writes '{}' which is already produced by '{}'",
                spec.id, spec.output, owner
            ))
            .with_stages(vec![*owner, spec.id])
            .with_error_info(
                ContractErrorInfo::new(
                    "PIPELINE-DUPLICATE-OUTPUT",
                    format!("Object '{}' has two producers", spec.output),
                )
                .with_fix_hint("Give every stage its own output object name."),
            ));
        }

        let mut dependencies = std::collections::BTreeSet::new();
        for input in spec.inputs() {
            let Some(producer) = self.producers.get(input) else {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' reads unknown object '{}'",
                    spec.id, input
                ))
                .with_stages(vec![spec.id])
                .with_error_info(
                    ContractErrorInfo::new(
                        "PIPELINE-UNKNOWN-INPUT",
                        format!("No earlier stage produces '{input}'"),
                    )
                    .with_fix_hint("Add the producing stage before the stage that reads it."),
                ));
            };
            dependencies.insert(*producer);
        }
        spec.dependencies = dependencies;

        self.producers.insert(spec.output.clone(), spec.id);
        self.stages.push(spec);
        Ok(())
    }

    /// Finishes the builder.
    ///
    /// # Errors
    ///
    /// Returns an error if no stage was added.
    pub fn build(self) -> Result<StageGraph, PipelineValidationError> {
        if self.stages.is_empty() {
            return Err(PipelineValidationError::new(format!(
                "Pipeline '{}' has no stages",
                self.name
            ))
            .with_error_info(
                ContractErrorInfo::new("PIPELINE-EMPTY", "Pipeline has no stages")
                    .with_fix_hint("Add at least one stage to the pipeline before building."),
            ));
        }
        Ok(StageGraph::new(self.name, self.stages))
    }
}

/// The seven-stage support-ticket analysis.
///
/// # Errors
///
/// Only fails if the built-in definition is inconsistent.
pub fn support_analysis_pipeline() -> Result<StageGraph, PipelineValidationError> {
    PipelineBuilder::new("support-analysis")
        .stage(StageSpec::ingest(StageId::Ingestion, DATASET_OBJECT))?
        .stage(
            StageSpec::apply(StageId::Sentiment, "sentiment_analysis", prompts::SENTIMENT)
                .with_inputs([DATASET_OBJECT]),
        )?
        .stage(
            StageSpec::apply(StageId::Categorization, "category_analysis", prompts::CATEGORIZATION)
                .with_inputs([DATASET_OBJECT]),
        )?
        .stage(
            StageSpec::apply(StageId::Escalation, "escalation_risk", prompts::ESCALATION)
                .with_inputs([DATASET_OBJECT, "sentiment_analysis"]),
        )?
        .stage(
            StageSpec::apply(StageId::Templates, "response_templates", prompts::TEMPLATES)
                .with_inputs([DATASET_OBJECT, "sentiment_analysis", "category_analysis"])
                .retained(ResultSlot::Templates),
        )?
        .stage(
            StageSpec::apply(StageId::Summary, "executive_summary", prompts::SUMMARY)
                .with_inputs([DATASET_OBJECT, "sentiment_analysis", "escalation_risk"])
                .retained(ResultSlot::Summary),
        )?
        .stage(
            StageSpec::apply(StageId::TicketAnalysis, "ticket_analysis", prompts::TICKET_ANALYSIS)
                .with_inputs([
                    DATASET_OBJECT,
                    "sentiment_analysis",
                    "escalation_risk",
                    "category_analysis",
                ])
                .retained(ResultSlot::Tickets),
        )?
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_default_pipeline_shape() {
        let graph = support_analysis_pipeline().unwrap();
        assert_eq!(graph.len(), 7);
        assert_eq!(graph.execution_order(), StageId::ALL.to_vec());
        assert_eq!(
            graph.object_names(),
            vec![
                "support_tickets",
                "sentiment_analysis",
                "category_analysis",
                "escalation_risk",
                "response_templates",
                "executive_summary",
                "ticket_analysis",
            ]
        );
    }

    #[test]
    fn test_default_pipeline_dependencies() {
        let graph = support_analysis_pipeline().unwrap();
        let deps = |id| graph.dependencies(id).into_iter().collect::<BTreeSet<_>>();

        assert!(deps(StageId::Ingestion).is_empty());
        assert_eq!(deps(StageId::Sentiment), BTreeSet::from([StageId::Ingestion]));
        assert_eq!(
            deps(StageId::Escalation),
            BTreeSet::from([StageId::Ingestion, StageId::Sentiment])
        );
        assert_eq!(
            deps(StageId::Templates),
            BTreeSet::from([StageId::Ingestion, StageId::Sentiment, StageId::Categorization])
        );
        assert_eq!(
            deps(StageId::Summary),
            BTreeSet::from([StageId::Ingestion, StageId::Sentiment, StageId::Escalation])
        );
        assert_eq!(
            deps(StageId::TicketAnalysis),
            BTreeSet::from([
                StageId::Ingestion,
                StageId::Sentiment,
                StageId::Categorization,
                StageId::Escalation
            ])
        );
    }

    #[test]
    fn test_retained_stages() {
        let graph = support_analysis_pipeline().unwrap();
        let retained: Vec<_> = graph
            .stages()
            .iter()
            .filter_map(|s| s.retain.map(|slot| (s.id, slot)))
            .collect();
        assert_eq!(
            retained,
            vec![
                (StageId::Templates, ResultSlot::Templates),
                (StageId::Summary, ResultSlot::Summary),
                (StageId::TicketAnalysis, ResultSlot::Tickets),
            ]
        );
    }

    #[test]
    fn test_unknown_input_rejected() {
        let err = PipelineBuilder::new("p")
            .stage(StageSpec::ingest(StageId::Ingestion, "data"))
            .unwrap()
            .stage(
                StageSpec::apply(StageId::Escalation, "risk", "{data} {sentiment}")
                    .with_inputs(["data", "sentiment"]),
            )
            .unwrap_err();
        assert_eq!(err.code(), Some("PIPELINE-UNKNOWN-INPUT"));
    }

    #[test]
    fn test_duplicate_output_rejected() {
        let err = PipelineBuilder::new("p")
            .stage(StageSpec::ingest(StageId::Ingestion, "data"))
            .unwrap()
            .stage(StageSpec::apply(StageId::Sentiment, "data_2", "{data}").with_inputs(["data"]))
            .unwrap()
            .stage(StageSpec::apply(StageId::Summary, "data_2", "{data}").with_inputs(["data"]))
            .unwrap_err();
        assert_eq!(err.code(), Some("PIPELINE-DUPLICATE-OUTPUT"));
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let err = PipelineBuilder::new("p")
            .stage(StageSpec::ingest(StageId::Ingestion, "a"))
            .unwrap()
            .stage(StageSpec::ingest(StageId::Ingestion, "b"))
            .unwrap_err();
        assert_eq!(err.code(), Some("PIPELINE-DUPLICATE-STAGE"));
    }

    #[test]
    fn test_empty_pipeline_rejected() {
        let err = PipelineBuilder::new("empty").build().unwrap_err();
        assert_eq!(err.code(), Some("PIPELINE-EMPTY"));
    }
}
