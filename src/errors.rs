use thiserror::Error;

pub type CxResult<T, E = CxError> = Result<T, E>;

/// Errors that can cross the crate boundary.
///
/// Most analysis-time trouble (undeclared use, unresolved call, a dropped
/// edge, an unevaluable preprocessor condition) never reaches this type —
/// it is recovered locally and made observable through the graph itself
/// (`tracing::warn!`/`debug!` plus edge shape) rather than raised. Only
/// parser failure, config, and I/O surface here.
#[derive(Debug, Error)]
pub enum CxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tree-sitter language error: {0}")]
    TreeSitter(#[from] tree_sitter::LanguageError),

    #[error("failed to parse {lang} source ({path})")]
    Parse { lang: String, path: String },

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("unknown graph kind: {0}")]
    UnknownGraphKind(String),

    #[error("{0}")]
    Msg(String),
}

impl From<&str> for CxError {
    fn from(s: &str) -> Self {
        CxError::Msg(s.to_owned())
    }
}

impl From<String> for CxError {
    fn from(s: String) -> Self {
        CxError::Msg(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_conversion_retains_message() {
        let e = std::io::Error::new(std::io::ErrorKind::Other, "boom!");
        let n: CxError = e.into();
        assert!(matches!(n, CxError::Io(_)));
        assert!(n.to_string().contains("boom"));
    }

    #[test]
    fn simple_string_into_msg() {
        let n: CxError = "plain msg".into();
        assert!(matches!(n, CxError::Msg(s) if s == "plain msg"));
    }

    #[test]
    fn parse_error_mentions_language_and_path() {
        let e = CxError::Parse {
            lang: "cpp".into(),
            path: "a.cpp".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("cpp"));
        assert!(msg.contains("a.cpp"));
    }
}
