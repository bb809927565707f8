use reqwest::header::{HeaderValue, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::{debug, instrument, trace};

use crate::{Error, Resource, Result, Session};

/// User agent used by the client 🥸
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:95.0) Gecko/20100101 Firefox/95.0";

/// Error returned by a [`Transport`].
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API root, without trailing slash.
    pub base_url: String,

    /// Value of the `v` query parameter expected by the portal.
    pub api_version: String,

    /// `User-Agent` header.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://api.ecoledirecte.com/v3".to_owned(),
            api_version: "4.53.4".to_owned(),
            user_agent: USER_AGENT.to_owned(),
        }
    }
}

/// A single `POST` to the portal.
#[derive(Debug)]
pub struct Request<'a> {
    /// Path relative to the API root, e.g. `E/1234/notes.awp`.
    pub path: &'a str,

    /// Session token sent as `X-Token`, if authenticated.
    pub token: Option<&'a SecretString>,

    /// JSON payload, sent form-encoded as `data=<json>`.
    pub payload: &'a Value,
}

/// What came back from the portal.
#[derive(Debug, Clone)]
pub struct Reply {
    /// HTTP status code.
    pub status: u16,

    /// Raw body.
    pub body: String,
}

/// Request plumbing. The blocking [`HttpTransport`] is the default; anything
/// else (a recording double, a proxy) can be plugged in.
pub trait Transport {
    /// Send `request` and return the raw reply.
    ///
    /// # Errors
    ///
    /// Fails only when no reply could be obtained at all.
    fn post(&self, request: Request<'_>) -> Result<Reply, TransportError>;
}

/// [`Transport`] backed by a blocking [`reqwest::blocking::Client`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    inner: reqwest::blocking::Client,
    config: Config,
}

impl HttpTransport {
    /// Build the underlying HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the [`reqwest`] client initialization fails.
    pub fn new(config: Config) -> reqwest::Result<Self> {
        let inner = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { inner, config })
    }
}

impl Transport for HttpTransport {
    #[instrument(skip_all, fields(path = request.path))]
    fn post(&self, request: Request<'_>) -> Result<Reply, TransportError> {
        let url = format!(
            "{}/{}?verbe=get&v={}",
            self.config.base_url, request.path, self.config.api_version
        );

        trace!("POST {url}");

        let mut builder = self
            .inner
            .post(url)
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .body(format!("data={}", request.payload));

        if let Some(token) = request.token {
            let mut value = HeaderValue::from_str(token.expose_secret())?;
            value.set_sensitive(true);
            builder = builder.header("X-Token", value);
        }

        let res = builder.send()?;
        let status = res.status().as_u16();

        trace!(status);

        Ok(Reply {
            status,
            body: res.text()?,
        })
    }
}

/// Envelope wrapped around every portal response.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub(crate) code: Option<u16>,
    #[serde(default)]
    pub(crate) token: Option<String>,
    #[serde(default)]
    pub(crate) message: Option<String>,
    pub(crate) data: Option<T>,
}

/// Portal codes meaning the token is no longer accepted.
const TOKEN_REJECTED: [u16; 2] = [520, 525];

/// An EcoleDirecte client. All resource fetchers take one of these plus the
/// [`Session`] obtained from [`Client::login`].
#[derive(Debug, Clone)]
pub struct Client<T = HttpTransport> {
    transport: T,
}

impl Client {
    /// Intialize a client talking HTTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying [`reqwest`] client initialization fails.
    pub fn new(config: Config) -> reqwest::Result<Self> {
        Ok(Self::with_transport(HttpTransport::new(config)?))
    }
}

impl<T: Transport> Client<T> {
    /// Use a custom transport.
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    /// The transport in use.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn send(
        &self,
        resource: &Resource,
        path: &str,
        token: Option<&SecretString>,
        payload: &Value,
    ) -> Result<Reply> {
        self.transport
            .post(Request {
                path,
                token,
                payload,
            })
            .map_err(|source| Error::Network {
                resource: resource.clone(),
                source,
            })
    }

    /// Authenticated call. The token in the response replaces the session's
    /// one before anything else is checked.
    #[instrument(skip(self, session, payload))]
    pub(crate) fn call<D: DeserializeOwned>(
        &self,
        session: &mut Session,
        resource: Resource,
        endpoint: &str,
        payload: &Value,
    ) -> Result<D> {
        session.ensure_authenticated()?;

        let path = format!("E/{}/{endpoint}", session.account().id);
        let reply = self.send(&resource, &path, Some(session.current_token()), payload)?;

        let success = (200..300).contains(&reply.status);
        let status_error = || Error::unexpected(&resource, format!("http status {}", reply.status));

        let envelope: Envelope<Value> = match serde_json::from_str(&reply.body) {
            Ok(envelope) => envelope,
            Err(_) if !success => return Err(status_error()),
            Err(e) => return Err(Error::unexpected(&resource, format!("invalid json: {e}"))),
        };

        if let Some(token) = envelope.token {
            session.adopt_token(token);
        }

        if !success {
            return Err(status_error());
        }

        match envelope.code {
            Some(200) | None => {}
            Some(code) if TOKEN_REJECTED.contains(&code) => {
                debug!(code, "token rejected");
                return Err(Error::Authentication {
                    details: envelope
                        .message
                        .unwrap_or_else(|| format!("token rejected (code {code})")),
                });
            }
            Some(code) => {
                return Err(Error::unexpected(
                    &resource,
                    format!(
                        "portal code {code}: {}",
                        envelope.message.unwrap_or_default()
                    ),
                ))
            }
        }

        let data = envelope
            .data
            .ok_or_else(|| Error::unexpected(&resource, "missing data"))?;

        serde_json::from_value(data).map_err(|e| Error::unexpected(&resource, e.to_string()))
    }
}
