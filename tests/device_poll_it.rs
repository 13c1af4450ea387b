#![cfg(feature = "reqwest")]

// std
use std::collections::VecDeque;
// crates.io
use tokio_util::sync::CancellationToken;
// self
use volc_auth::{
	_preludet::*,
	error::AuthErrorKind,
	http::{
		ResponseMetadata, ResponseMetadataSlot, TokenHttpClient,
		oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse, http::StatusCode},
	},
	oauth::{DeviceAccessTokenRequest, DeviceOAuthClient},
};

#[derive(Debug)]
struct ScriptExhausted;
impl Display for ScriptExhausted {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Scripted transport ran out of responses.")
	}
}
impl StdError for ScriptExhausted {}

type Script = Arc<Mutex<VecDeque<(u16, String)>>>;

/// Replays canned token endpoint responses in order and counts requests.
#[derive(Clone, Default)]
struct ScriptedHttpClient {
	script: Script,
	calls: Arc<Mutex<usize>>,
}
impl ScriptedHttpClient {
	fn new<I>(responses: I) -> Self
	where
		I: IntoIterator<Item = (u16, String)>,
	{
		Self { script: Arc::new(Mutex::new(responses.into_iter().collect())), ..Default::default() }
	}

	fn calls(&self) -> usize {
		*self.calls.lock()
	}
}
impl TokenHttpClient for ScriptedHttpClient {
	type Handle = ScriptedHandle;
	type TransportError = ScriptExhausted;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		ScriptedHandle { slot, script: self.script.clone(), calls: self.calls.clone() }
	}
}

struct ScriptedHandle {
	slot: ResponseMetadataSlot,
	script: Script,
	calls: Arc<Mutex<usize>>,
}
impl<'a> AsyncHttpClient<'a> for ScriptedHandle {
	type Error = HttpClientError<ScriptExhausted>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send + Sync>>;

	fn call(&'a self, _request: HttpRequest) -> Self::Future {
		let slot = self.slot.clone();
		let next = self.script.lock().pop_front();

		*self.calls.lock() += 1;

		Box::pin(async move {
			let Some((status, body)) = next else {
				return Err(HttpClientError::Other(ScriptExhausted.to_string()));
			};
			let mut response = HttpResponse::new(body.into_bytes());

			*response.status_mut() =
				StatusCode::from_u16(status).expect("Scripted status should be valid.");
			slot.store(ResponseMetadata { status: Some(status), log_id: Some("log-poll".into()) });

			Ok(response)
		})
	}
}

fn pending() -> (u16, String) {
	auth_failure("authorization_pending")
}

fn auth_failure(code: &str) -> (u16, String) {
	(400, format!(r#"{{"error_code":"{code}","error_message":"{code}"}}"#))
}

fn success() -> (u16, String) {
	(200, r#"{"access_token":"device-token","expires_in":3600,"refresh_token":"r"}"#.into())
}

fn client(transport: &ScriptedHttpClient) -> DeviceOAuthClient<ScriptedHttpClient> {
	DeviceOAuthClient::with_http_client(
		"device-client",
		test_client_options("https://api.example.com"),
		Arc::new(transport.clone()),
	)
	.expect("Device client should build.")
}

#[tokio::test(start_paused = true)]
async fn polling_waits_out_pending_responses() {
	let transport = ScriptedHttpClient::new([pending(), pending(), success()]);
	let started = tokio::time::Instant::now();
	let token = client(&transport)
		.get_access_token(DeviceAccessTokenRequest::new("dc-1").with_poll(true))
		.await
		.expect("Polling should end with a token.");

	assert_eq!(token.access_token.expose(), "device-token");
	assert_eq!(token.log_id.as_deref(), Some("log-poll"));
	assert_eq!(transport.calls(), 3);
	assert_eq!(started.elapsed(), std::time::Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn slow_down_widens_the_interval() {
	let transport = ScriptedHttpClient::new([auth_failure("slow_down"), success()]);
	let started = tokio::time::Instant::now();

	client(&transport)
		.get_access_token(DeviceAccessTokenRequest::new("dc-1").with_poll(true))
		.await
		.expect("Polling should end with a token.");

	assert_eq!(transport.calls(), 2);
	assert_eq!(started.elapsed(), std::time::Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn repeated_slow_down_caps_the_interval() {
	let transport = ScriptedHttpClient::new(
		std::iter::repeat_with(|| auth_failure("slow_down")).take(6).chain([success()]),
	);
	let started = tokio::time::Instant::now();

	client(&transport)
		.get_access_token(DeviceAccessTokenRequest::new("dc-1").with_poll(true))
		.await
		.expect("Polling should end with a token.");

	// 10 + 15 + 20 + 25 + 30 + 30.
	assert_eq!(transport.calls(), 7);
	assert_eq!(started.elapsed(), std::time::Duration::from_secs(130));
}

#[tokio::test(start_paused = true)]
async fn denial_ends_polling_immediately() {
	let transport = ScriptedHttpClient::new([auth_failure("access_denied"), success()]);
	let err = client(&transport)
		.get_access_token(DeviceAccessTokenRequest::new("dc-1").with_poll(true))
		.await
		.expect_err("Denied authorization should fail.");

	assert_eq!(err.as_auth_error().map(|auth| auth.kind()), Some(AuthErrorKind::AccessDenied));
	assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn single_shot_returns_pending_error() {
	let transport = ScriptedHttpClient::new([pending(), success()]);
	let err = client(&transport)
		.get_access_token(DeviceAccessTokenRequest::new("dc-1"))
		.await
		.expect_err("Single exchange should surface the pending error.");

	assert_eq!(
		err.as_auth_error().map(|auth| auth.kind()),
		Some(AuthErrorKind::AuthorizationPending)
	);
	assert_eq!(err.log_id(), Some("log-poll"));
	assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_the_wait() {
	let transport = ScriptedHttpClient::new([pending(), pending(), pending()]);
	let cancellation = CancellationToken::new();
	let device = client(&transport);
	let request = DeviceAccessTokenRequest::new("dc-1")
		.with_poll(true)
		.with_cancellation(cancellation.clone());
	let (result, ()) = tokio::join!(device.get_access_token(request), async {
		tokio::time::sleep(std::time::Duration::from_secs(7)).await;
		cancellation.cancel();
	});

	assert!(matches!(result, Err(Error::Cancelled)));
	assert_eq!(transport.calls(), 2);
}
