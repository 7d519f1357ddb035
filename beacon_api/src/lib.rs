pub use crate::{
    client::BeaconNodeClient,
    endpoint::{BeaconEndpoint, RedactingUrl},
    error::Error,
};

mod client;
mod endpoint;
mod error;
mod responses;
