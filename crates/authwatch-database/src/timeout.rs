use crate::error::{DbError, DbResult};
use std::future::Future;
use std::time::Duration;

/// Bound a storage call by the operation timeout.
pub(crate) async fn with_timeout<T, E, F>(limit: Duration, fut: F) -> DbResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<DbError>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(DbError::Timeout(limit)),
    }
}
