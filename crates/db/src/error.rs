//! Context wrapping for gateway failures that cross a multi-step pipeline.

/// A query failure tagged with the pipeline step that issued it.
#[derive(Debug, thiserror::Error)]
#[error("{context}: {source}")]
pub struct QueryError {
    pub context: &'static str,
    #[source]
    pub source: sqlx::Error,
}

pub trait QueryContext<T> {
    fn context(self, context: &'static str) -> Result<T, QueryError>;
}

impl<T> QueryContext<T> for Result<T, sqlx::Error> {
    fn context(self, context: &'static str) -> Result<T, QueryError> {
        self.map_err(|source| QueryError { context, source })
    }
}
