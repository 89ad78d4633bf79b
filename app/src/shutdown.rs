use std::time::Duration;

use chat_sources::SourceHandle;
use tokio::time::timeout;

use crate::app::SharedState;

const SOURCE_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Cancel every background loop and wait for the chat adapters to close
/// their connections.
pub async fn graceful_shutdown(state: &SharedState, sources: Vec<SourceHandle>) {
    tracing::info!("Shutdown sequence started");

    state.shutdown_token().cancel();
    tracing::info!("Shutdown: background loops cancelled");

    for handle in sources {
        let platform = handle.platform();
        match timeout(SOURCE_JOIN_TIMEOUT, handle.join()).await {
            Ok(Ok(())) => tracing::info!(%platform, "Shutdown: chat source closed"),
            Ok(Err(e)) => tracing::warn!(%platform, error = %e, "Shutdown: chat source ended with error"),
            Err(_) => tracing::warn!(%platform, "Shutdown: chat source did not stop in time"),
        }
    }

    tracing::info!("Shutdown sequence completed");
}

#[cfg(test)]
mod tests {
    use chat_bus::Platform;
    use chat_sources::{ChatSource, Phase, SessionContext, SourceError, spawn_source};

    use super::*;
    use crate::config::AppConfig;

    struct IdleSource;

    impl ChatSource for IdleSource {
        fn platform(&self) -> Platform {
            Platform::YouTube
        }

        async fn session(&mut self, ctx: &mut SessionContext) -> Result<(), SourceError> {
            ctx.mark_streaming();
            while !ctx.sleep_or_cancel(Duration::from_secs(60)).await {}
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancels_token_and_joins_sources() {
        let state = SharedState::new(AppConfig::default());
        let handle = spawn_source(
            IdleSource,
            state.bus().publisher(),
            state.shutdown_token().clone(),
        );
        let phase = handle.phase_receiver();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(*phase.borrow(), Phase::Streaming);

        graceful_shutdown(&state, vec![handle]).await;

        assert!(state.shutdown_token().is_cancelled());
        assert_eq!(*phase.borrow(), Phase::Stopped);
    }
}
