use std::io;

#[derive(Debug, thiserror::Error)]
pub enum SimpleApiError {
    #[error("fixture {name} is not valid JSON: {source}")]
    Fixture {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("fixture {0} must be a JSON array")]
    NotAnArray(&'static str),

    #[error("bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] io::Error),
}

pub type SimpleApiResult<T> = Result<T, SimpleApiError>;
