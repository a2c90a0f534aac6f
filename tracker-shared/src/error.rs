use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("\"{value}\" is not a valid choice for {field}")]
    InvalidChoice { field: &'static str, value: String },
    #[error("database error: {0}")]
    DatabaseError(String),
}

impl From<sea_orm::DbErr> for TrackerError {
    fn from(err: sea_orm::DbErr) -> Self {
        TrackerError::DatabaseError(err.to_string())
    }
}
