// self
use crate::{_prelude::*, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by OAuth flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("volc_auth.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event before the device flow sleeps between polls.
pub fn record_poll_wait(code: &str, interval: std::time::Duration) {
	#[cfg(feature = "tracing")]
	tracing::debug!(code, interval_secs = interval.as_secs(), "device authorization still pending");

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (code, interval);
	}
}

/// Emits a trace event for every token cache lookup.
pub fn record_cache_lookup(key: &str, hit: bool) {
	#[cfg(feature = "tracing")]
	tracing::trace!(key, hit, "token cache lookup");

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (key, hit);
	}
}

/// Emits a debug event when the background sweeper evicts entries.
pub fn record_sweep(removed: usize) {
	#[cfg(feature = "tracing")]
	{
		if removed > 0 {
			tracing::debug!(removed, "token cache sweep evicted entries");
		}
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = removed;
	}
}

/// Emits an info event after a token source replaced its access token.
pub fn record_token_refresh(client_id: &str, refresh_at: OffsetDateTime) {
	#[cfg(feature = "tracing")]
	tracing::info!(client_id, refresh_at = refresh_at.unix_timestamp(), "token source refreshed");

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (client_id, refresh_at);
	}
}

/// Emits a warning when a value cannot be written as an HTTP header and is skipped.
pub fn record_header_skipped(name: &str) {
	#[cfg(feature = "tracing")]
	tracing::warn!(header = name, "header value is not representable; skipping");

	#[cfg(not(feature = "tracing"))]
	{
		let _ = name;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn event_helpers_are_callable_in_any_configuration() {
		record_poll_wait("authorization_pending", std::time::Duration::from_secs(5));
		record_cache_lookup("client:::", false);
		record_sweep(0);
		record_header_skipped("X-Security-Token");
		record_token_refresh("client", OffsetDateTime::UNIX_EPOCH);
	}

	#[cfg(feature = "tracing")]
	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = FlowSpan::new(FlowKind::Refresh, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
