#![cfg(unix)]

mod support;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use critical_core::ExtractionRequest;
use critical_engine::{
    extract_critical_css, ArtifactKind, CodecError, ExtractionError, ExtractionFailureKind,
    RendererInvoker,
};
use futures_util::future::join_all;
use pretty_assertions::assert_eq;
use support::{init_logging, StubRenderer, CAT_INPUTS, ECHO_ARGS};
use tokio_util::sync::CancellationToken;
use url::Url;

#[tokio::test]
async fn successful_run_returns_stdout_verbatim() {
    init_logging();
    let stub = StubRenderer::new("printf 'h1{color:red}\\n'\n");

    let css = extract_critical_css("<html><h1>x</h1></html>", "h1{color:red}p{}", &stub.config)
        .await
        .unwrap();

    assert_eq!(css, b"h1{color:red}\n");
    assert!(stub.leftover_artifacts().is_empty());
}

#[tokio::test]
async fn empty_output_is_a_success() {
    init_logging();
    let stub = StubRenderer::new("exit 0\n");

    let css = extract_critical_css("<html></html>", "", &stub.config)
        .await
        .unwrap();

    assert!(css.is_empty());
    assert!(stub.leftover_artifacts().is_empty());
}

#[tokio::test]
async fn nonzero_exit_carries_code_and_stderr() {
    init_logging();
    let stub = StubRenderer::new("echo 'penthouse: cannot parse stylesheet' >&2\nexit 1\n");

    let err = extract_critical_css("<html></html>", "a{", &stub.config)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ExtractionFailureKind::ExternalTool);
    match err {
        ExtractionError::ExternalTool { code, stderr } => {
            assert_eq!(code, Some(1));
            assert!(stderr.contains("penthouse: cannot parse stylesheet"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(stub.leftover_artifacts().is_empty());
}

#[tokio::test]
async fn html_is_passed_as_file_url_and_css_as_path() {
    init_logging();
    let stub = StubRenderer::new(ECHO_ARGS);

    let stdout = extract_critical_css("<html></html>", "a{}", &stub.config)
        .await
        .unwrap();
    let stdout = String::from_utf8(stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("file:"), "html argument: {}", lines[0]);
    assert!(lines[0].ends_with(".html"));
    let html_path = Url::parse(lines[0]).unwrap().to_file_path().unwrap();
    assert_eq!(html_path.parent(), Some(stub.artifacts.as_path()));

    assert!(!lines[1].contains(':'), "css argument: {}", lines[1]);
    assert!(lines[1].ends_with(".css"));
    let css_path = PathBuf::from(lines[1]);
    assert_eq!(css_path.parent(), Some(stub.artifacts.as_path()));

    assert!(!html_path.exists());
    assert!(!css_path.exists());
}

#[tokio::test]
async fn renderer_sees_complete_encoded_inputs() {
    init_logging();
    let mut stub = StubRenderer::new(CAT_INPUTS);
    stub.config.encoding = "iso-8859-1".to_string();

    let stdout = extract_critical_css("<p>café</p>", "p:after{content:'é'}", &stub.config)
        .await
        .unwrap();

    assert_eq!(stdout, b"<p>caf\xe9</p>p:after{content:'\xe9'}".to_vec());
}

#[tokio::test]
async fn unrepresentable_html_fails_before_spawning() {
    init_logging();
    let mut stub = StubRenderer::new("touch \"$(dirname \"$0\")/spawned\"\n");
    stub.config.encoding = "iso-8859-1".to_string();

    let err = extract_critical_css("<p>日本</p>", "", &stub.config)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ExtractionFailureKind::Encoding);
    match err {
        ExtractionError::Encoding { artifact, source } => {
            assert_eq!(artifact, ArtifactKind::Html);
            assert_eq!(
                source,
                CodecError::Unmappable {
                    encoding: "windows-1252".to_string(),
                    character: '日',
                    offset: 3,
                }
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!stub.root.path().join("spawned").exists());
    assert!(stub.leftover_artifacts().is_empty());
}

#[tokio::test]
async fn unrepresentable_css_releases_staged_html() {
    init_logging();
    let mut stub = StubRenderer::new("exit 0\n");
    stub.config.encoding = "iso-8859-1".to_string();

    let err = extract_critical_css("<p>ok</p>", "p:before{content:'→'}", &stub.config)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExtractionError::Encoding {
            artifact: ArtifactKind::Css,
            ..
        }
    ));
    assert!(stub.leftover_artifacts().is_empty());
}

#[tokio::test]
async fn unknown_encoding_is_an_encoding_failure() {
    init_logging();
    let mut stub = StubRenderer::new("exit 0\n");
    stub.config.encoding = "klingon".to_string();

    let err = extract_critical_css("", "", &stub.config).await.unwrap_err();

    assert_eq!(err.kind(), ExtractionFailureKind::Encoding);
    assert!(stub.leftover_artifacts().is_empty());
}

#[tokio::test]
async fn missing_renderer_is_a_spawn_failure() {
    init_logging();
    let mut stub = StubRenderer::new(ECHO_ARGS);
    stub.config.renderer = stub.root.path().join("no-such-renderer");

    let err = extract_critical_css("<html></html>", "a{}", &stub.config)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ExtractionFailureKind::Spawn);
    assert!(matches!(err, ExtractionError::Spawn { .. }));
    assert!(stub.leftover_artifacts().is_empty());
}

#[tokio::test]
async fn missing_helper_surfaces_as_nonzero_exit() {
    init_logging();
    let mut stub = StubRenderer::new(ECHO_ARGS);
    stub.config.helper_script = stub.root.path().join("no-such-helper.js");

    let err = extract_critical_css("<html></html>", "a{}", &stub.config)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ExtractionFailureKind::ExternalTool);
    assert!(stub.leftover_artifacts().is_empty());
}

#[tokio::test]
async fn slow_renderer_is_killed_after_timeout() {
    init_logging();
    let mut stub = StubRenderer::new("exec sleep 10\n");
    stub.config.timeout_ms = Some(200);

    let started = Instant::now();
    let err = extract_critical_css("<html></html>", "a{}", &stub.config)
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(
        err,
        ExtractionError::Timeout { after } if after == Duration::from_millis(200)
    ));
    assert!(stub.leftover_artifacts().is_empty());
}

#[tokio::test]
async fn cancellation_kills_renderer_and_cleans_up() {
    init_logging();
    let stub = StubRenderer::new("exec sleep 10\n");
    let invoker = RendererInvoker::new(stub.config.clone());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = invoker
        .extract_with_cancel(&ExtractionRequest::new("<html></html>", "a{}"), cancel)
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(err.kind(), ExtractionFailureKind::Cancelled);
    assert!(stub.leftover_artifacts().is_empty());
}

#[tokio::test]
async fn dropped_extraction_still_removes_artifacts() {
    init_logging();
    let stub = StubRenderer::new("exec sleep 10\n");
    let invoker = RendererInvoker::new(stub.config.clone());
    let request = ExtractionRequest::new("<html></html>", "a{}");

    let outcome =
        tokio::time::timeout(Duration::from_millis(150), invoker.extract(&request)).await;

    assert!(outcome.is_err());
    assert!(stub.leftover_artifacts().is_empty());
}

#[tokio::test]
async fn concurrent_invocations_use_distinct_artifacts() {
    init_logging();
    let stub = StubRenderer::new(ECHO_ARGS);
    let invoker = RendererInvoker::new(stub.config.clone());
    let requests: Vec<_> = (0..4)
        .map(|i| ExtractionRequest::new(format!("<p>{i}</p>"), format!("p{{order:{i}}}")))
        .collect();

    let outputs = join_all(requests.iter().map(|request| invoker.extract(request))).await;

    let mut seen = Vec::new();
    for output in outputs {
        let stdout = String::from_utf8(output.unwrap()).unwrap();
        seen.extend(stdout.lines().map(str::to_string));
    }
    let total = seen.len();
    seen.sort();
    seen.dedup();
    assert_eq!(total, 8);
    assert_eq!(seen.len(), 8);
    assert!(stub.leftover_artifacts().is_empty());
}
