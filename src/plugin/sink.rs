//! Destinations for mint results.
//!
//! Streaming callers hand in the send half of their response stream;
//! unary callers collect into a `Vec`.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::types::MintX509CaResponse;

/// The sink refused the result.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SinkError(String);

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Receives the result of a mint call.
#[async_trait]
pub trait ResultSink: Send {
    async fn send(&mut self, response: MintX509CaResponse) -> Result<(), SinkError>;
}

#[async_trait]
impl ResultSink for mpsc::Sender<MintX509CaResponse> {
    async fn send(&mut self, response: MintX509CaResponse) -> Result<(), SinkError> {
        mpsc::Sender::send(self, response)
            .await
            .map_err(|_| SinkError::new("response stream closed by caller"))
    }
}

#[async_trait]
impl ResultSink for Vec<MintX509CaResponse> {
    async fn send(&mut self, response: MintX509CaResponse) -> Result<(), SinkError> {
        self.push(response);
        Ok(())
    }
}
