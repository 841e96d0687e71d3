/// Configuration for authenticating incoming webhook events.
#[derive(Default, serde::Deserialize)]
#[serde(default)]
pub struct Config
{
	/// To verify that incoming webhook payloads actually come from GitHub.com, provide the webhook
	/// secret configured in the repository or organization settings.
	pub secret: Option<String>,
	/// What to do with incoming payloads while no secret is configured (default: `reject`).
	pub unsigned_payloads: UnsignedPayloadPolicy,
}

/// How to treat incoming payloads if no webhook secret is configured.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsignedPayloadPolicy
{
	/// Reject all payloads, as their origin can’t be verified.
	#[default]
	Reject,
	/// Accept all payloads without checking signatures. Anyone who can reach the service is able to
	/// send messages to the chat, so only use this for local testing.
	Accept,
}

impl std::str::FromStr for UnsignedPayloadPolicy
{
	type Err = ();

	fn from_str(value: &str) -> Result<Self, Self::Err>
	{
		match value
		{
			"reject" => Ok(Self::Reject),
			"accept" => Ok(Self::Accept),
			_ => Err(()),
		}
	}
}

/// Verifies webhook event payloads against the configured secret.
pub struct Verifier<'a>
{
	#[doc(hidden)]
	config: &'a Config,
}

impl<'a> Verifier<'a>
{
	/// Create a verifier for webhook events, authenticated according to the given configuration.
	///
	/// # Arguments
	/// - `config`: The webhook secret and the policy for unsigned payloads.
	pub fn new(config: &'a Config) -> Self
	{
		Self{config}
	}

	/// Whether the payload carries a valid signature, or is accepted without one by policy.
	///
	/// This is the boolean form of [Verifier::check] for callers that don’t need to tell a missing
	/// signature (400) from an invalid one (403). The webhook handler does, so only tests call this.
	///
	/// # Arguments
	/// - `payload`: The raw, unparsed request body.
	/// - `provided_signature`: The value of the `X-Hub-Signature-256` header, if present.
	#[allow(dead_code)]
	pub fn verify(&self, payload: &[u8], provided_signature: Option<&str>) -> bool
	{
		self.check(payload, provided_signature).is_ok()
	}

	/// Verify a webhook event payload by checking the provided signature.
	///
	/// Returns [crate::Error::MissingPayloadSignature] if a secret is configured but the request
	/// isn’t signed, and [crate::Error::InvalidPayloadSignature] for all other failures, including
	/// unsigned payloads being rejected by policy.
	pub fn check(&self, payload: &[u8], provided_signature: Option<&str>)
		-> Result<(), crate::Error>
	{
		let secret = match self.config.secret.as_deref()
		{
			Some(secret) => secret,
			None => return match self.config.unsigned_payloads
			{
				UnsignedPayloadPolicy::Accept =>
				{
					log::debug!("no webhook secret configured, accepting payload without checking \
						its signature");
					Ok(())
				},
				UnsignedPayloadPolicy::Reject =>
				{
					log::warn!("no webhook secret configured, rejecting payload");
					Err(crate::Error::InvalidPayloadSignature)
				},
			},
		};

		// Require a valid payload signature. If none is provided, reject the request
		let provided_signature = match provided_signature
		{
			Some(provided_signature) => provided_signature,
			None =>
			{
				log::warn!("received payload without signature");
				return Err(crate::Error::MissingPayloadSignature);
			},
		};

		let expected_signature = sign(payload, secret);

		// Compare the provided signature with what we expect it to be. Use a secure string wrapper that
		// provides a constant-time equality comparator to prevent timing attacks. This also covers
		// headers using a prefix other than sha256=, which never match
		let provided_signature = secstr::SecStr::from(provided_signature);
		let expected_signature = secstr::SecStr::from(expected_signature);

		if provided_signature == expected_signature
		{
			log::debug!("successfully verified payload signature");
			Ok(())
		}
		else
		{
			log::warn!("received payload with invalid signature");
			Err(crate::Error::InvalidPayloadSignature)
		}
	}
}

/// Compute the `X-Hub-Signature-256` header value GitHub sends for a payload.
///
/// # Arguments
/// - `payload`: The raw request body.
/// - `secret`: The shared webhook secret.
pub fn sign(payload: &[u8], secret: &str) -> String
{
	use hmac::Mac as _;

	let mut mac = hmac::Hmac::<sha2::Sha256>::new_from_slice(secret.as_bytes())
		.expect("this call is infallible because HMAC supports keys of arbitrary size");

	mac.update(payload);

	format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
