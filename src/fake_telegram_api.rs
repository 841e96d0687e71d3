//! A stand-in for the Telegram Bot API, served by warp on an ephemeral local port.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A request received by the fake API.
#[derive(Clone, Debug)]
pub struct SentMessage
{
	/// The first path segment, `bot<token>`.
	pub bot: String,
	/// The JSON request body.
	pub body: serde_json::Value,
}

type Responder =
	dyn Fn(usize) -> (warp::http::StatusCode, serde_json::Value) + Send + Sync + 'static;

pub struct FakeTelegramApi
{
	/// Base URL to configure the client with.
	pub base_url: url::Url,
	calls: Arc<AtomicUsize>,
	messages: Arc<Mutex<Vec<SentMessage>>>,
}

impl FakeTelegramApi
{
	/// Serve requests with the given responder, which receives the zero-based index of each call.
	/// Must be called from within a tokio runtime.
	pub fn start<F>(respond: F, delay: Option<std::time::Duration>) -> Self
	where
		F: Fn(usize) -> (warp::http::StatusCode, serde_json::Value) + Send + Sync + 'static,
	{
		use warp::Filter as _;

		let calls = Arc::new(AtomicUsize::new(0));
		let messages = Arc::new(Mutex::new(Vec::new()));
		let respond: Arc<Responder> = Arc::new(respond);

		let route = {
			let calls = calls.clone();
			let messages = messages.clone();

			warp::post()
				.and(warp::path!(String / "sendMessage"))
				.and(warp::body::json())
				.and_then(move |bot: String, body: serde_json::Value|
				{
					let calls = calls.clone();
					let messages = messages.clone();
					let respond = respond.clone();

					async move
					{
						let index = calls.fetch_add(1, Ordering::SeqCst);
						messages.lock().unwrap().push(SentMessage{bot, body});

						if let Some(delay) = delay
						{
							tokio::time::sleep(delay).await;
						}

						let (status_code, response_body) = respond(index);

						Ok::<_, std::convert::Infallible>(
							warp::reply::with_status(warp::reply::json(&response_body), status_code))
					}
				})
		};

		let (address, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
		tokio::spawn(server);

		let base_url = url::Url::parse(&format!("http://{address}/")).unwrap();

		Self{base_url, calls, messages}
	}

	/// Accept every message.
	pub fn accepting() -> Self
	{
		Self::start(|index| (warp::http::StatusCode::OK, sent_message(index)), None)
	}

	/// Reject every message with the given status code and description.
	pub fn rejecting(status_code: warp::http::StatusCode, description: &'static str) -> Self
	{
		Self::start(move |_| (status_code, error_response(status_code, description)), None)
	}

	/// Reject only the call with the given zero-based index and accept all others.
	pub fn rejecting_call(rejected_index: usize) -> Self
	{
		Self::start(move |index|
			{
				if index == rejected_index
				{
					let status_code = warp::http::StatusCode::BAD_REQUEST;
					(status_code, error_response(status_code, "Bad Request: message is too long"))
				}
				else
				{
					(warp::http::StatusCode::OK, sent_message(index))
				}
			},
			None)
	}

	/// Number of requests received so far.
	pub fn calls(&self) -> usize
	{
		self.calls.load(Ordering::SeqCst)
	}

	/// Requests received so far, in order of arrival.
	pub fn messages(&self) -> Vec<SentMessage>
	{
		self.messages.lock().unwrap().clone()
	}
}

fn sent_message(index: usize) -> serde_json::Value
{
	serde_json::json!({"ok": true, "result": {"message_id": index + 1}})
}

fn error_response(status_code: warp::http::StatusCode, description: &str) -> serde_json::Value
{
	serde_json::json!({"ok": false, "error_code": status_code.as_u16(), "description": description})
}
