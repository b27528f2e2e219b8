use critical_core::{
    AggregateError, AggregatedCss, ExtractionConfig, ExtractionRequest, FetchFailurePolicy,
    StyleSource,
};
use tokio_util::sync::CancellationToken;

use crate::aggregate::CssAggregator;
use crate::fetch::StyleFetcher;
use crate::invoke::RendererInvoker;
use crate::ExtractionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub critical_css: Vec<u8>,
    pub aggregation: AggregatedCss,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Page plus style sources in, critical css out.
pub struct CriticalCssPipeline<F> {
    aggregator: CssAggregator<F>,
    invoker: RendererInvoker,
}

impl<F: StyleFetcher> CriticalCssPipeline<F> {
    pub fn new(
        fetcher: F,
        config: ExtractionConfig,
        policy: FetchFailurePolicy,
    ) -> Result<Self, ExtractionError> {
        let aggregator = CssAggregator::for_config(fetcher, &config)
            .map_err(ExtractionError::UnknownEncoding)?
            .with_policy(policy);
        Ok(Self {
            aggregator,
            invoker: RendererInvoker::new(config),
        })
    }

    pub fn config(&self) -> &ExtractionConfig {
        self.invoker.config()
    }

    pub async fn aggregate(&self, sources: &[StyleSource]) -> Result<AggregatedCss, AggregateError> {
        self.aggregator.aggregate(sources).await
    }

    pub async fn render(
        &self,
        html: &str,
        aggregation: AggregatedCss,
        cancel: CancellationToken,
    ) -> Result<PipelineOutput, PipelineError> {
        let request = ExtractionRequest::new(html, aggregation.css.as_str());
        let critical_css = self.invoker.extract_with_cancel(&request, cancel).await?;
        Ok(PipelineOutput {
            critical_css,
            aggregation,
        })
    }

    pub async fn run(
        &self,
        html: &str,
        sources: &[StyleSource],
    ) -> Result<PipelineOutput, PipelineError> {
        let aggregation = self.aggregate(sources).await?;
        self.render(html, aggregation, CancellationToken::new()).await
    }
}
