use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AppError {
    #[error("store: {0}")]
    Store(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(feature = "infra-sqlx")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".to_string()),
            other => AppError::Store(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_carry_their_reason() {
        let err = AppError::Store("in-memory store poisoned".to_string());
        assert_eq!(err.to_string(), "store: in-memory store poisoned");

        // 处理器以 anyhow 传播存储错误，原因保留在错误链中
        let handler_err = anyhow::Error::from(err);
        assert!(format!("{handler_err:#}").contains("poisoned"));
    }
}
