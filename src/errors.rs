use polars::prelude::PolarsError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing column: {0}")]
    MissingColumn(String),
    #[error("Upstream API error: {0:?}")]
    UpstreamApi(Vec<String>),
    #[error("Series is empty")]
    EmptySeries,
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
    #[error("Invalid timestamp at row {row}: {value:?}")]
    InvalidTimestamp { row: usize, value: String },
    #[error("Invalid interval: {0:?}")]
    InvalidInterval(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Generic request error: {0:?}")]
    GenericRequest(String),
    #[error("Json parse error: {0:?}")]
    JsonParse(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Polars(#[from] PolarsError),
}
