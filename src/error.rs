use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("file lookup returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("file lookup returned no file path")]
    MissingFilePath,
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to prepare image for recognition: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to run tesseract (is it installed?): {0}")]
    Spawn(std::io::Error),
    #[error("tesseract failed: {0}")]
    Engine(String),
}

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("translate endpoint returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed translate response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("send returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}
