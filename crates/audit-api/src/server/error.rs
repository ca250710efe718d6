#[derive(Debug)]
pub enum ServerError {
    Io(std::io::Error),
    Persistence(PersistenceError),
    Engine(EngineError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "server io error: {err}"),
            Self::Persistence(err) => write!(f, "server persistence error: {err}"),
            Self::Engine(err) => write!(f, "server engine error: {err}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<std::io::Error> for ServerError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<PersistenceError> for ServerError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

#[derive(Debug)]
struct HttpApiError {
    status: StatusCode,
    error: ApiError,
}

impl HttpApiError {
    fn invalid_request(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: ApiError::new(ErrorCode::InvalidAction, message, details),
        }
    }

    /// Maps a rejected action onto a status code by error class.
    fn from_rejection(error: ApiError) -> Self {
        let status = match error.error_code {
            ErrorCode::PhaseConflict | ErrorCode::InsufficientBalance => StatusCode::CONFLICT,
            ErrorCode::InvalidVote
            | ErrorCode::InvalidAction
            | ErrorCode::ContractVersionUnsupported => StatusCode::BAD_REQUEST,
            ErrorCode::PersistenceFailure | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self { status, error }
    }
}

impl IntoResponse for HttpApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}
