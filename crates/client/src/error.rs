use engine::ServiceError;
use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base_url: {0}")]
    InvalidUrl(String),
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{status}: {message}")]
    Server { status: StatusCode, message: String },
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("authentication failed for {0}")]
    Unauthorized(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ClientError> for ServiceError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Http(err) => ServiceError::Transport(err.to_string()),
            ClientError::Server { status, message } => ServiceError::Server {
                status: status.as_u16(),
                message,
            },
            ClientError::Rpc(message) => ServiceError::Rpc(message),
            ClientError::Unauthorized(login) => ServiceError::Server {
                status: StatusCode::UNAUTHORIZED.as_u16(),
                message: format!("authentication failed for {login}"),
            },
            ClientError::Malformed(message) => ServiceError::Malformed(message),
            other => ServiceError::Transport(other.to_string()),
        }
    }
}
