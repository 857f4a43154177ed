use std::fmt;

/// Error carried inside `anyhow::Error` for every failed write. The code is a
/// SQLSTATE-style class so callers can branch without string matching.
#[derive(Debug)]
pub struct EditorError {
    pub code: &'static str,
    pub message: String,
}

impl EditorError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for EditorError {}

pub(crate) fn sql_err(code: &'static str, msg: impl Into<String>) -> anyhow::Error {
    anyhow::Error::new(EditorError::new(code, msg.into()))
}

/// SQLSTATE-style code of an error produced by this crate, if any.
pub fn error_code(err: &anyhow::Error) -> Option<&'static str> {
    err.downcast_ref::<EditorError>().map(|e| e.code)
}
