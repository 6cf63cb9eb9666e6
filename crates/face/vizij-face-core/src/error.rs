//! Error types for vizij-face-core.
//!
//! Only construction and message intake can fail. The per-frame path never
//! returns an error; it degrades to a neutral pose instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FaceError {
    #[error("rig descriptor declares no shapes")]
    EmptyVocabulary,

    #[error("rig descriptor declares shape '{0}' more than once")]
    DuplicateShape(String),

    #[error("rig descriptor declares clip '{0}' more than once")]
    DuplicateClip(String),

    #[error("invalid expression table: {0}")]
    ExpressionTable(String),

    #[error("audio payload is not valid base64: {0}")]
    AudioDecode(#[from] base64::DecodeError),

    #[error("audio sink rejected payload: {0}")]
    AudioSink(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FaceError>;
