#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },
}
