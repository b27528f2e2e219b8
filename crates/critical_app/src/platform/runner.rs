use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context};
use critical_core::{ExtractionConfig, FetchFailurePolicy, StyleSource};
use critical_engine::{
    decode_text, resolve_encoding, CriticalCssOutputs, CriticalCssPipeline, EngineEvent,
    EngineHandle, ExtractionJob, JobId, PipelineOutput, ReqwestFetcher,
};
use encoding_rs::Encoding;
use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use serde_json::json;

use super::cli::{Cli, StyleArg};

/// Runs every document through the engine. Returns `false` when at least
/// one extraction failed.
pub(crate) fn run(cli: &Cli, config: ExtractionConfig) -> anyhow::Result<bool> {
    if cli.html.len() > 1 && cli.out_dir.is_none() {
        bail!("--out-dir is required when more than one HTML document is given");
    }

    let outputs = match &cli.out_dir {
        Some(dir) => {
            let outputs = CriticalCssOutputs::prepare(dir)?;
            outputs.plan(&cli.html)?;
            Some(outputs)
        }
        None => None,
    };

    let encoding = resolve_encoding(&config.encoding)?;
    let sources = resolve_sources(&cli.styles, encoding)?;
    let mut documents = Vec::with_capacity(cli.html.len());
    for path in &cli.html {
        let bytes =
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let html = decode_text(&bytes, encoding)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        documents.push((path.clone(), html));
    }

    let policy = if cli.strict {
        FetchFailurePolicy::Abort
    } else {
        FetchFailurePolicy::Skip
    };
    let pipeline = CriticalCssPipeline::new(ReqwestFetcher::default(), config, policy)?;
    let engine = EngineHandle::new(pipeline);

    for (job_id, (path, html)) in documents.iter().enumerate() {
        engine_info!("Enqueue job_id={} document={}", job_id, path.display());
        engine.enqueue(
            job_id as JobId,
            ExtractionJob {
                html: html.clone(),
                sources: sources.clone(),
            },
        );
    }

    let mut remaining = documents.len();
    let mut failures = 0usize;
    while remaining > 0 {
        let Some(event) = engine.recv() else {
            bail!("extraction engine stopped with {remaining} job(s) outstanding");
        };
        match event {
            EngineEvent::Progress(progress) => {
                engine_debug!("Job {} stage {:?}", progress.job_id, progress.stage);
            }
            EngineEvent::JobCompleted { job_id, result } => {
                remaining -= 1;
                let path = &documents[job_id as usize].0;
                match result {
                    Ok(output) => {
                        if cli.report {
                            print_report(path, &output)?;
                        }
                        if output.aggregation.is_degraded() {
                            engine_warn!(
                                "{}: {} style source(s) skipped",
                                path.display(),
                                output.aggregation.failures().count()
                            );
                        }
                        emit_output(outputs.as_ref(), path, &output.critical_css)?;
                    }
                    Err(err) => {
                        failures += 1;
                        engine_error!("{}: {}", path.display(), err);
                    }
                }
            }
        }
    }

    Ok(failures == 0)
}

/// Local stylesheets are decoded like fetched ones, with the configured encoding.
fn resolve_sources(
    styles: &[StyleArg],
    encoding: &'static Encoding,
) -> anyhow::Result<Vec<StyleSource>> {
    styles
        .iter()
        .map(|style| match style {
            StyleArg::Link(href) => Ok(StyleSource::link(href.clone())),
            StyleArg::Inline(text) => Ok(StyleSource::inline(text.clone())),
            StyleArg::File(path) => {
                let bytes = fs::read(path)
                    .with_context(|| format!("failed to read stylesheet {}", path.display()))?;
                let text = decode_text(&bytes, encoding)
                    .with_context(|| format!("failed to decode stylesheet {}", path.display()))?;
                Ok(StyleSource::inline(text))
            }
        })
        .collect()
}

fn emit_output(
    outputs: Option<&CriticalCssOutputs>,
    document: &Path,
    css: &[u8],
) -> anyhow::Result<()> {
    match outputs {
        Some(outputs) => {
            let target = outputs.write(document, css)?;
            engine_info!("Wrote {} bytes to {:?}", css.len(), target);
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(css)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn print_report(document: &Path, output: &PipelineOutput) -> anyhow::Result<()> {
    let report = json!({
        "document": document.display().to_string(),
        "stylesheet_bytes": output.aggregation.css.len(),
        "critical_bytes": output.critical_css.len(),
        "sources": output.aggregation.sources,
    });
    eprintln!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
