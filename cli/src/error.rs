use scoped_fs_search::Error;

const CLI_ERROR_CODE_JSON: &str = "json";

#[derive(Debug)]
pub(crate) enum CliError {
    Tool(Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Tool(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Tool(err) => Some(err),
            CliError::Json(err) => Some(err),
        }
    }
}

impl From<Error> for CliError {
    fn from(err: Error) -> Self {
        Self::Tool(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl CliError {
    pub(crate) fn code(&self) -> &'static str {
        match self {
            CliError::Tool(err) => err.code(),
            CliError::Json(_) => CLI_ERROR_CODE_JSON,
        }
    }
}

fn details_map(kind: &str) -> serde_json::Map<String, serde_json::Value> {
    let mut out = serde_json::Map::new();
    out.insert(
        "kind".to_string(),
        serde_json::Value::String(kind.to_string()),
    );
    out
}

/// Structured details for `--error-format json`.
///
/// Access denials only ever report the shared code, never which rule fired.
pub(crate) fn tool_error_details(tool: &Error) -> serde_json::Value {
    let mut out = details_map(tool.code());
    match tool {
        _ if tool.is_access_denial() => {}
        Error::IoPath { op, path, source } => {
            out.insert("op".to_string(), serde_json::json!(op));
            out.insert("path".to_string(), serde_json::json!(path.display().to_string()));
            out.insert(
                "io_kind".to_string(),
                serde_json::Value::String(format!("{:?}", source.kind())),
            );
        }
        Error::Io(err) => {
            out.insert(
                "io_kind".to_string(),
                serde_json::Value::String(format!("{:?}", err.kind())),
            );
        }
        Error::InvalidPolicy(message)
        | Error::InvalidPath(message)
        | Error::InvalidPageParameters(message) => {
            out.insert("message".to_string(), serde_json::json!(message));
        }
        Error::NotARegularFile(path) | Error::NotADirectory(path) | Error::InvalidEncoding(path) => {
            out.insert("path".to_string(), serde_json::json!(path.display().to_string()));
        }
        Error::UnreadableDocument { path, reason } => {
            out.insert("path".to_string(), serde_json::json!(path.display().to_string()));
            out.insert("reason".to_string(), serde_json::json!(reason));
        }
        Error::InvalidPattern { pattern, message } => {
            out.insert("pattern".to_string(), serde_json::json!(pattern));
            out.insert("message".to_string(), serde_json::json!(message));
        }
        Error::TimeLimitExceeded {
            limit_ms,
            elapsed_ms,
        } => {
            out.insert("limit_ms".to_string(), serde_json::json!(limit_ms));
            out.insert("elapsed_ms".to_string(), serde_json::json!(elapsed_ms));
        }
        Error::FileTooLarge {
            path,
            size_bytes,
            max_bytes,
        } => {
            out.insert("path".to_string(), serde_json::json!(path.display().to_string()));
            out.insert("size_bytes".to_string(), serde_json::json!(size_bytes));
            out.insert("max_bytes".to_string(), serde_json::json!(max_bytes));
        }
        Error::InputTooLarge {
            size_bytes,
            max_bytes,
        } => {
            out.insert("size_bytes".to_string(), serde_json::json!(size_bytes));
            out.insert("max_bytes".to_string(), serde_json::json!(max_bytes));
        }
        _ => {}
    }
    serde_json::Value::Object(out)
}

/// `{"error": {"code", "message", "details"}}`
pub(crate) fn render_json_error(err: &CliError) -> serde_json::Value {
    let mut error = serde_json::Map::new();
    error.insert(
        "code".to_string(),
        serde_json::Value::String(err.code().to_string()),
    );
    error.insert(
        "message".to_string(),
        serde_json::Value::String(err.to_string()),
    );
    if let CliError::Tool(tool) = err {
        error.insert("details".to_string(), tool_error_details(tool));
    }
    serde_json::json!({ "error": error })
}
