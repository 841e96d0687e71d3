/// All errors that may occur during initialization or while handling requests.
#[derive(Debug, thiserror::Error)]
pub enum Error
{
	#[error("could not read config file")]
	ReadConfigFile(#[source] std::io::Error),
	#[error("could not parse config file")]
	ParseConfigFile(#[source] serde_yaml::Error),
	#[error("invalid value “{value}” for environment variable {name}")]
	InvalidEnvironmentVariable
	{
		name: &'static str,
		value: String,
	},

	#[error("could not create HTTP client")]
	CreateHttpClient(#[source] reqwest::Error),
	#[error("could not parse URL")]
	ParseUrl(#[source] url::ParseError),

	#[error("Telegram bot token or chat ID not configured")]
	MissingTelegramConfiguration,
	#[error("could not send Telegram message")]
	SendTelegramMessage(#[source] reqwest::Error),
	#[error("received Telegram API error (status code {status_code}): {description}")]
	ReceivedTelegramApiError
	{
		status_code: reqwest::StatusCode,
		description: String,
	},

	#[error("could not decode payload body")]
	DecodePayloadBody(#[source] serde_json::Error),
	#[error("missing payload signature")]
	MissingPayloadSignature,
	#[error("invalid payload signature")]
	InvalidPayloadSignature,
}

// Allow this crate’s error type to be used for failed HTTP responses
impl warp::reject::Reject for Error
{
}
