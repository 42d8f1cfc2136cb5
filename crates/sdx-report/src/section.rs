//! Normalization of analytics module output into report sections.
//!
//! Modules may drop a chart or a whole table group when their input columns
//! are absent. The builder turns every such gap into an explicit
//! [`ContentBlock::Unavailable`] so layout never has to special-case a
//! missing section.

use crate::asset::{AssetRenderer, ChartSpec};
use crate::error::DataUnavailableError;
use crate::model::{ContentBlock, RecommendationTableGroup, ReportSection};
use crate::warning::{ReportWarning, Warnings};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A chart position in a module's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartSlot {
    /// The module produced a chart.
    Chart(ChartSpec),
    /// The module could not produce this chart.
    Missing {
        /// Chart title, if the module knows it.
        #[serde(default)]
        title: Option<String>,
        reason: String,
    },
}

/// Raw output of one analytics module, in registration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleOutput {
    pub title: String,
    #[serde(default)]
    pub charts: Vec<ChartSlot>,
    /// Pre-formatted narrative paragraphs.
    #[serde(default)]
    pub narrative: Vec<String>,
    #[serde(default)]
    pub recommendations: Option<RecommendationTableGroup>,
    /// Input columns the module needed but did not find.
    #[serde(default)]
    pub missing_columns: Vec<String>,
}

impl ModuleOutput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            charts: Vec::new(),
            narrative: Vec::new(),
            recommendations: None,
            missing_columns: Vec::new(),
        }
    }

    pub fn with_chart(mut self, spec: ChartSpec) -> Self {
        self.charts.push(ChartSlot::Chart(spec));
        self
    }

    pub fn with_missing_chart(mut self, title: impl Into<String>, reason: impl Into<String>) -> Self {
        self.charts.push(ChartSlot::Missing {
            title: Some(title.into()),
            reason: reason.into(),
        });
        self
    }

    pub fn with_paragraph(mut self, text: impl Into<String>) -> Self {
        self.narrative.push(text.into());
        self
    }

    pub fn with_recommendations(mut self, group: RecommendationTableGroup) -> Self {
        self.recommendations = Some(group);
        self
    }

    pub fn with_missing_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.missing_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    fn unavailable_reason(&self, reason: &str) -> String {
        if self.missing_columns.is_empty() {
            reason.to_string()
        } else {
            format!("{} (missing columns: {})", reason, self.missing_columns.join(", "))
        }
    }
}

/// Sections built from a batch of modules plus the warnings raised on the way.
#[derive(Debug, Clone, Default)]
pub struct SectionBatch {
    pub sections: Vec<ReportSection>,
    pub warnings: Warnings,
}

/// Builds [`ReportSection`]s, rendering charts through an [`AssetRenderer`].
pub struct SectionBuilder<'a> {
    renderer: &'a AssetRenderer,
}

impl<'a> SectionBuilder<'a> {
    pub fn new(renderer: &'a AssetRenderer) -> Self {
        Self { renderer }
    }

    /// Build one section.
    pub fn build(&self, module: &ModuleOutput) -> SectionBatch {
        self.build_all(std::slice::from_ref(module))
    }

    /// Build sections for all modules, preserving input order.
    ///
    /// Every chart across the batch is rendered in one parallel pass before
    /// the sections are assembled.
    pub fn build_all(&self, modules: &[ModuleOutput]) -> SectionBatch {
        let specs: Vec<&ChartSpec> = modules
            .iter()
            .flat_map(|m| m.charts.iter())
            .filter_map(|slot| match slot {
                ChartSlot::Chart(spec) => Some(spec),
                ChartSlot::Missing { .. } => None,
            })
            .collect();
        let mut outcomes = self.renderer.render_all(&specs).into_iter();

        let mut batch = SectionBatch::default();
        for module in modules {
            let mut blocks = Vec::new();

            for slot in &module.charts {
                match slot {
                    ChartSlot::Chart(spec) => {
                        let Some(outcome) = outcomes.next() else {
                            break;
                        };
                        if let Some(err) = &outcome.error {
                            batch
                                .warnings
                                .push(ReportWarning::asset(Some(&module.title), &spec.title, err));
                        }
                        blocks.push(ContentBlock::Asset(outcome.asset));
                    }
                    ChartSlot::Missing { title, reason } => {
                        let subject = match title {
                            Some(t) => format!("chart '{}'", t),
                            None => "chart".to_string(),
                        };
                        let err = DataUnavailableError {
                            section: module.title.clone(),
                            subject: subject.clone(),
                            reason: module.unavailable_reason(reason),
                        };
                        batch.warnings.push(ReportWarning::data(&err));
                        blocks.push(ContentBlock::Unavailable {
                            subject,
                            reason: err.reason,
                        });
                    }
                }
            }

            blocks.extend(
                module
                    .narrative
                    .iter()
                    .filter(|p| !p.trim().is_empty())
                    .map(|p| ContentBlock::Paragraph(p.trim().to_string())),
            );

            match &module.recommendations {
                Some(group) => blocks.push(ContentBlock::Recommendations(group.clone())),
                None if !module.missing_columns.is_empty() => {
                    let err = DataUnavailableError {
                        section: module.title.clone(),
                        subject: "recommendation tables".to_string(),
                        reason: module.unavailable_reason("required input columns are absent"),
                    };
                    batch.warnings.push(ReportWarning::data(&err));
                    blocks.push(ContentBlock::Unavailable {
                        subject: err.subject,
                        reason: err.reason,
                    });
                }
                None => {}
            }

            if blocks.is_empty() {
                batch.warnings.push(ReportWarning::data(&DataUnavailableError {
                    section: module.title.clone(),
                    subject: "section data".to_string(),
                    reason: "module produced no content".to_string(),
                }));
            }

            debug!(
                section = %module.title,
                blocks = blocks.len(),
                "Section built"
            );
            batch.sections.push(ReportSection::new(module.title.clone(), blocks));
        }
        batch
    }
}
