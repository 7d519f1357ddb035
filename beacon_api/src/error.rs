use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum Error {
    #[error("beacon node {label} responded to {path} with {status} (response: {message})")]
    UnexpectedStatusCode {
        label: String,
        path: String,
        status: StatusCode,
        message: String,
    },
    #[error("beacon node {label} returned a block for slot {actual} when asked for slot {requested}")]
    SlotMismatch {
        label: String,
        requested: u64,
        actual: u64,
    },
}
