use std::fmt;

use serde::{Deserialize, Serialize};

/// One contribution to an assembled stylesheet.
///
/// `href` names a remote stylesheet to fetch, `text` is literal CSS appended
/// verbatim. Either, both or neither may be set; when both are set the fetched
/// contribution comes first. A source with neither contributes nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StyleSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl StyleSource {
    pub fn link(href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            text: None,
        }
    }

    pub fn inline(text: impl Into<String>) -> Self {
        Self {
            href: None,
            text: Some(text.into()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.href.is_none() && self.text.is_none()
    }
}

/// What to do when a linked stylesheet cannot be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchFailurePolicy {
    /// Record the failure in the report and continue with the next source.
    #[default]
    Skip,
    /// Stop at the first failure and return it as an error.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Included,
    Empty,
    FetchFailed { href: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub index: usize,
    pub status: SourceStatus,
    pub contributed_bytes: usize,
}

/// Concatenated stylesheet plus what each source contributed to it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AggregatedCss {
    pub css: String,
    pub sources: Vec<SourceReport>,
}

impl AggregatedCss {
    /// True when at least one linked stylesheet was skipped.
    pub fn is_degraded(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources
            .iter()
            .filter(|report| matches!(report.status, SourceStatus::FetchFailed { .. }))
    }

    pub fn into_css(self) -> String {
        self.css
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    #[error("style source {index} could not be fetched from {href}: {reason}")]
    FetchFailed {
        index: usize,
        href: String,
        reason: String,
    },
}

/// Incremental builder behind both the synchronous [`aggregate`] and the
/// engine's async aggregator. Sources must be pushed in input order.
#[derive(Debug)]
pub struct CssAssembler {
    policy: FetchFailurePolicy,
    css: String,
    reports: Vec<SourceReport>,
}

impl CssAssembler {
    pub fn new(policy: FetchFailurePolicy) -> Self {
        Self {
            policy,
            css: String::new(),
            reports: Vec::new(),
        }
    }

    /// Appends one source. `fetched` is the outcome of fetching `source.href`
    /// and is `None` when the source has no link.
    pub fn push(
        &mut self,
        index: usize,
        source: &StyleSource,
        fetched: Option<Result<String, String>>,
    ) -> Result<(), AggregateError> {
        let start = self.css.len();
        let mut status = if source.is_empty() {
            SourceStatus::Empty
        } else {
            SourceStatus::Included
        };

        match fetched {
            Some(Ok(text)) => self.css.push_str(&text),
            Some(Err(reason)) => {
                let href = source.href.clone().unwrap_or_default();
                if self.policy == FetchFailurePolicy::Abort {
                    return Err(AggregateError::FetchFailed {
                        index,
                        href,
                        reason,
                    });
                }
                status = SourceStatus::FetchFailed { href, reason };
            }
            None => {}
        }

        if let Some(text) = source.text.as_deref() {
            self.css.push_str(text);
        }

        self.reports.push(SourceReport {
            index,
            status,
            contributed_bytes: self.css.len() - start,
        });
        Ok(())
    }

    pub fn finish(self) -> AggregatedCss {
        AggregatedCss {
            css: self.css,
            sources: self.reports,
        }
    }
}

/// Concatenates `sources` in order, fetching linked stylesheets with `fetch`.
pub fn aggregate<F, E>(
    sources: &[StyleSource],
    policy: FetchFailurePolicy,
    mut fetch: F,
) -> Result<AggregatedCss, AggregateError>
where
    F: FnMut(&str) -> Result<String, E>,
    E: fmt::Display,
{
    let mut assembler = CssAssembler::new(policy);
    for (index, source) in sources.iter().enumerate() {
        let fetched = source
            .href
            .as_deref()
            .map(|href| fetch(href).map_err(|err| err.to_string()));
        assembler.push(index, source, fetched)?;
    }
    Ok(assembler.finish())
}
