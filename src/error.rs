use thiserror::Error;

#[derive(Error, Debug)]
pub enum CostingError {
    #[error("Workbook contains no readable sheets")]
    EmptyWorkbook,

    #[error("Invalid similarity threshold {0}: must be between 0.0 and 1.0")]
    InvalidThreshold(f64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Recipe '{recipe}' states a total cost of {stated:.4} but its ingredients sum to {computed:.4}")]
    RecipeTotalMismatch {
        recipe: String,
        stated: f64,
        computed: f64,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CostingError>;
