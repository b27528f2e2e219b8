use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use super::logging::LogDestination;

/// One `--style` value, in the order given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleArg {
    Link(String),
    Inline(String),
    File(PathBuf),
}

#[derive(Parser, Debug)]
#[command(name = "critical")]
#[command(about = "Extract above-the-fold CSS by running an external renderer")]
pub struct Cli {
    /// HTML documents to reduce.
    #[arg(required = true)]
    pub html: Vec<PathBuf>,

    /// Style source: `link:<url>`, `inline:<css>` or `file:<path>`. Repeatable;
    /// sources are concatenated in the order given.
    #[arg(long = "style", short = 's', value_parser = parse_style)]
    pub styles: Vec<StyleArg>,

    /// RON configuration file (defaults to ./critical.ron when present).
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub renderer: Option<PathBuf>,

    #[arg(long)]
    pub helper: Option<PathBuf>,

    #[arg(long)]
    pub encoding: Option<String>,

    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Fail instead of skipping a linked stylesheet that cannot be fetched.
    #[arg(long)]
    pub strict: bool,

    /// Write `<stem>.critical.css` per document here instead of to stdout.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print the per-source aggregation report as JSON on stderr.
    #[arg(long)]
    pub report: bool,

    #[arg(long, default_value = "warn", value_parser = parse_log_level)]
    pub log_level: LevelFilter,

    /// Also log to ./critical.log.
    #[arg(long)]
    pub log_file: bool,
}

impl Cli {
    pub fn log_destination(&self) -> LogDestination {
        if self.log_file {
            LogDestination::Both
        } else {
            LogDestination::Terminal
        }
    }
}

fn parse_style(value: &str) -> Result<StyleArg, String> {
    let (kind, payload) = value
        .split_once(':')
        .ok_or_else(|| format!("expected link:<url>, inline:<css> or file:<path>, got {value:?}"))?;
    match kind {
        "link" => Ok(StyleArg::Link(payload.to_string())),
        "inline" => Ok(StyleArg::Inline(payload.to_string())),
        "file" => Ok(StyleArg::File(PathBuf::from(payload))),
        other => Err(format!("unknown style source kind {other:?}")),
    }
}

fn parse_log_level(value: &str) -> Result<LevelFilter, String> {
    engine_logging::parse_level(value).ok_or_else(|| format!("unknown log level {value:?}"))
}

#[cfg(test)]
mod tests {
    use super::{Cli, StyleArg};
    use clap::Parser;
    use log::LevelFilter;
    use std::path::PathBuf;

    #[test]
    fn styles_keep_command_line_order() {
        let cli = Cli::parse_from([
            "critical",
            "index.html",
            "--style",
            "inline:a{}",
            "-s",
            "link:https://cdn.example.com/site.css",
            "--style",
            "file:theme.css",
        ]);

        assert_eq!(
            cli.styles,
            vec![
                StyleArg::Inline("a{}".to_string()),
                StyleArg::Link("https://cdn.example.com/site.css".to_string()),
                StyleArg::File(PathBuf::from("theme.css")),
            ]
        );
        assert_eq!(cli.log_level, LevelFilter::Warn);
    }

    #[test]
    fn inline_css_may_contain_colons() {
        let cli = Cli::parse_from(["critical", "a.html", "-s", "inline:a{color:red}"]);
        assert_eq!(cli.styles, vec![StyleArg::Inline("a{color:red}".to_string())]);
    }

    #[test]
    fn unknown_style_kind_is_rejected() {
        let result = Cli::try_parse_from(["critical", "a.html", "-s", "ftp:x"]);
        assert!(result.is_err());
    }

    #[test]
    fn at_least_one_document_is_required() {
        assert!(Cli::try_parse_from(["critical"]).is_err());
    }
}
