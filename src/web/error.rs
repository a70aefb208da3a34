use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::accounts::AccountError;
use crate::commands::CommandError;

/// Everything a request can fail with, rendered as `{error, status}` JSON.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error("not logged in")]
    NotLoggedIn,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Command(err) => match err {
                CommandError::UnknownActor(_)
                | CommandError::UnknownUnit(_)
                | CommandError::UnknownGroup(_)
                | CommandError::UnknownTile(_) => StatusCode::NOT_FOUND,
                CommandError::PopulationCap { .. }
                | CommandError::InsufficientResources { .. }
                | CommandError::NothingToHarvest(_) => StatusCode::CONFLICT,
                CommandError::UndiscoveredTile(_) | CommandError::EmptyGroup => {
                    StatusCode::BAD_REQUEST
                }
            },
            Self::Account(err) => match err {
                AccountError::EmptyCredentials => StatusCode::BAD_REQUEST,
                AccountError::UserExists(_) => StatusCode::CONFLICT,
                AccountError::UnknownUser(_) | AccountError::WrongPassword => {
                    StatusCode::UNAUTHORIZED
                }
                AccountError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotLoggedIn => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::UnitId;
    use crate::resources::ResourceKind;

    #[test]
    fn command_errors_map_to_client_statuses() {
        assert_eq!(
            ApiError::from(CommandError::UnknownUnit(UnitId(3))).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(CommandError::NothingToHarvest(ResourceKind::Gold)).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(CommandError::EmptyGroup).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AccountError::WrongPassword)
                .into_response()
                .status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
