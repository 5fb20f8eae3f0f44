//! Console presentation for dry runs.

use async_trait::async_trait;
use kaiwa_core::persona::PersonaIdentity;
use kaiwa_core::session::DestinationId;

use super::{DispatchError, DispatchOutcome, Dispatcher};

/// Prints turns to standard output instead of posting them.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleDispatcher;

#[async_trait]
impl Dispatcher for ConsoleDispatcher {
    async fn present_as(
        &self,
        destination: DestinationId,
        identity: &PersonaIdentity,
        text: &str,
    ) -> Result<DispatchOutcome, DispatchError> {
        tracing::trace!(%destination, persona_id = %identity.persona_id, "Console dispatch");
        println!("[{}] {}: {}", destination, identity.display_name, text);
        Ok(DispatchOutcome::AsPersona)
    }
}
