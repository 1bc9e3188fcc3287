use thiserror::Error;

pub type PsResult<T> = Result<T, PsError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PsError {
    #[error("Non-finite coordinate for {what}: ({x}, {y})")]
    NonFinite { what: String, x: f64, y: f64 },
}
