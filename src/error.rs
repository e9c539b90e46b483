use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlidecastError {
    #[error("Invalid time label '{label}':\n{msg}")]
    TimeLabel { label: String, msg: String },
    #[error("Malformed JSON")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported timeline format: expected a list of time labels or a list of {{\"t\", \"page\"}} objects")]
    TimelineFormat(#[source] serde_json::Error),
    #[error("Unsupported cuts format: expected a list of [start, end] pairs")]
    CutsFormat(#[source] serde_json::Error),
    #[error("Unsupported audio format: '{0}'")]
    UnsupportedAudio(String),
    #[error("{tool} exited with {status}: {stderr}")]
    Tool {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("No slide images available in '{0}'")]
    NoSlides(String),
}
