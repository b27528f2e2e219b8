use critical_core::{
    AggregateError, AggregatedCss, CssAssembler, ExtractionConfig, FetchFailurePolicy, StyleSource,
};
use encoding_rs::Encoding;
use engine_logging::{engine_debug, engine_warn};

use crate::codec::{decode_text, resolve_encoding, CodecError};
use crate::fetch::StyleFetcher;
use crate::{FailureKind, FetchError};

/// Builds one stylesheet out of linked and inline sources, in input order.
pub struct CssAggregator<F> {
    fetcher: F,
    encoding: &'static Encoding,
    policy: FetchFailurePolicy,
}

impl<F: StyleFetcher> CssAggregator<F> {
    pub fn new(fetcher: F, encoding: &'static Encoding) -> Self {
        Self {
            fetcher,
            encoding,
            policy: FetchFailurePolicy::default(),
        }
    }

    /// Uses the encoding named by `config` to decode fetched stylesheets.
    pub fn for_config(fetcher: F, config: &ExtractionConfig) -> Result<Self, CodecError> {
        Ok(Self::new(fetcher, resolve_encoding(&config.encoding)?))
    }

    pub fn with_policy(mut self, policy: FetchFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn aggregate(&self, sources: &[StyleSource]) -> Result<AggregatedCss, AggregateError> {
        let mut assembler = CssAssembler::new(self.policy);
        for (index, source) in sources.iter().enumerate() {
            let fetched = match source.href.as_deref() {
                Some(href) => {
                    let result = self.fetch_text(href).await.map_err(|err| err.to_string());
                    if let Err(reason) = &result {
                        engine_warn!("Style source {} ({}) failed: {}", index, href, reason);
                    }
                    Some(result)
                }
                None => None,
            };
            assembler.push(index, source, fetched)?;
        }

        let aggregated = assembler.finish();
        engine_debug!(
            "Aggregated {} style sources into {} bytes ({} failed)",
            sources.len(),
            aggregated.css.len(),
            aggregated.failures().count()
        );
        Ok(aggregated)
    }

    async fn fetch_text(&self, href: &str) -> Result<String, FetchError> {
        let output = self.fetcher.fetch(href).await?;
        decode_text(&output.bytes, self.encoding)
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))
    }
}
