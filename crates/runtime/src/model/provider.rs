use std::future::Future;

use tokio::sync::mpsc;

use super::errors::ModelError;
use super::types::{AgentConfig, ModelCommand, ProviderEvent, SessionBinding};

/// Channels to a connected model.
///
/// Dropping `commands` must end the remote session. The provider drops its
/// event sender when the remote side goes away.
#[derive(Debug)]
pub struct ModelLink {
    pub commands: mpsc::Sender<ModelCommand>,
    pub events: mpsc::Receiver<ProviderEvent>,
}

/// A hosted conversational model.
pub trait ModelProvider: Send + Sync {
    /// Complete the transport handshake and return the live channels.
    fn connect(
        &self,
        config: &AgentConfig,
        binding: &SessionBinding,
    ) -> impl Future<Output = Result<ModelLink, ModelError>> + Send;
}
