use core::time::Duration;

use anyhow::{ensure, Result};
use async_trait::async_trait;
use mime::APPLICATION_JSON;
use pipeline::{CanonicalBlock, ChainDataClient, ChainHead, HeadDataSource};
use reqwest::{header::ACCEPT, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use types::{
    containers::{Attestation, Proposal},
    primitives::{Slot, UnixSeconds, H256},
};

use crate::{
    endpoint::BeaconEndpoint,
    error::Error,
    responses::{
        BlockAttestations, DataResponse, Genesis, HeaderData, ProducedBlock, RootData,
        VersionedResponse,
    },
};

// Point at infinity. Accepted by beacon nodes when RANDAO verification is skipped.
const RANDAO_REVEAL: &str = "0xc000000000000000000000000000000000000000000000000000000000000000\
                             0000000000000000000000000000000000000000000000000000000000000000\
                             0000000000000000000000000000000000000000000000000000000000000000";
const GRAFFITI: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";

/// Beacon Node API client for one endpoint.
pub struct BeaconNodeClient {
    endpoint: BeaconEndpoint,
    client: Client,
    timeout: Duration,
}

impl BeaconNodeClient {
    #[must_use]
    pub const fn new(endpoint: BeaconEndpoint, client: Client, timeout: Duration) -> Self {
        Self {
            endpoint,
            client,
            timeout,
        }
    }

    #[must_use]
    pub const fn endpoint(&self) -> &BeaconEndpoint {
        &self.endpoint
    }

    pub async fn fetch_genesis_time(&self) -> Result<UnixSeconds> {
        let response = self
            .get::<DataResponse<Genesis>>("/eth/v1/beacon/genesis", &[])
            .await?;

        Ok(response.data.genesis_time)
    }

    pub async fn fetch_block_proposal(&self, slot: Slot) -> Result<Proposal> {
        let path = format!("/eth/v2/validator/blocks/{slot}");

        let query = [
            ("randao_reveal", RANDAO_REVEAL),
            ("graffiti", GRAFFITI),
            ("skip_randao_verification", ""),
        ];

        let VersionedResponse { version, data } = self
            .get::<VersionedResponse<ProducedBlock>>(&path, &query)
            .await?;

        let block = data.into_block();

        ensure!(
            block.slot == slot,
            Error::SlotMismatch {
                label: self.endpoint.label.clone(),
                requested: slot,
                actual: block.slot,
            },
        );

        Ok(Proposal {
            phase: version,
            block,
        })
    }

    pub async fn fetch_head_header(&self) -> Result<ChainHead> {
        let DataResponse { data } = self
            .get::<DataResponse<HeaderData>>("/eth/v1/beacon/headers/head", &[])
            .await?;

        Ok(ChainHead {
            slot: data.header.message.slot,
            root: data.root,
        })
    }

    /// Returns `None` if the slot is empty.
    pub async fn fetch_block_root(&self, slot: Slot) -> Result<Option<H256>> {
        let path = format!("/eth/v1/beacon/blocks/{slot}/root");

        let response = self
            .get_optional::<DataResponse<RootData>>(&path, &[])
            .await?;

        Ok(response.map(|response| response.data.root))
    }

    pub async fn fetch_block_attestations(&self, block_root: H256) -> Result<Vec<Attestation>> {
        let path = format!("/eth/v2/beacon/blocks/{block_root:?}/attestations");

        let response = self
            .get::<VersionedResponse<BlockAttestations>>(&path, &[])
            .await?;

        Ok(response.data)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let response = self.send(path, query).await?;
        let response = self.handle_error(path, response).await?;

        Ok(response.json().await?)
    }

    async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let response = self.send(path, query).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = self.handle_error(path, response).await?;

        Ok(Some(response.json().await?))
    }

    async fn send(&self, path: &str, query: &[(&str, &str)]) -> Result<Response> {
        let url = self.endpoint.url.join(path)?;

        debug!(label = %self.endpoint.label, "GET {path}");

        self.client
            .get(url)
            .query(query)
            .header(ACCEPT, APPLICATION_JSON.as_ref())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(Into::into)
    }

    async fn handle_error(&self, path: &str, response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await?;

        Err(Error::UnexpectedStatusCode {
            label: self.endpoint.label.clone(),
            path: path.to_owned(),
            status,
            message,
        }
        .into())
    }
}

#[async_trait]
impl ChainDataClient for BeaconNodeClient {
    fn label(&self) -> &str {
        &self.endpoint.label
    }

    async fn fetch_proposal(&self, slot: Slot) -> Result<Proposal> {
        self.fetch_block_proposal(slot).await
    }
}

#[async_trait]
impl HeadDataSource for BeaconNodeClient {
    fn label(&self) -> &str {
        &self.endpoint.label
    }

    async fn head(&self) -> Result<ChainHead> {
        self.fetch_head_header().await
    }

    async fn canonical_block(&self, slot: Slot) -> Result<Option<CanonicalBlock>> {
        let Some(root) = self.fetch_block_root(slot).await? else {
            return Ok(None);
        };

        let attestations = self.fetch_block_attestations(root).await?;

        Ok(Some(CanonicalBlock { root, attestations }))
    }
}
