/// Input of one extraction: the full page and the stylesheet to reduce.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractionRequest {
    pub html: String,
    pub css: String,
}

impl ExtractionRequest {
    pub fn new(html: impl Into<String>, css: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            css: css.into(),
        }
    }
}
