use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::{
    client::{Envelope, Transport},
    Client, Error, Resource, Result,
};

/// The account a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Numeric account id used in every resource path.
    pub id: u64,

    /// Login name.
    #[serde(rename = "identifiant", default)]
    pub username: String,

    /// First name.
    #[serde(rename = "prenom", default)]
    pub first_name: String,

    /// Last name.
    #[serde(rename = "nom", default)]
    pub last_name: String,

    /// Account type, `E` for students.
    #[serde(rename = "typeCompte", default)]
    pub kind: String,
}

/// EcoleDirecte session info.
///
/// The token rotates: every authenticated response may carry a new one,
/// which replaces the current token right away.
#[derive(Debug)]
pub struct Session {
    token: SecretString,
    account: Account,
}

impl Session {
    /// Build a session from a known token, e.g. one kept from an earlier run.
    pub fn new(token: SecretString, account: Account) -> Self {
        Self { token, account }
    }

    /// Most recently issued token.
    pub fn current_token(&self) -> &SecretString {
        &self.token
    }

    /// Account this session belongs to.
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Replace the token with a newer one. Empty tokens are ignored.
    pub fn adopt_token(&mut self, token: impl Into<String>) {
        let token = token.into();

        if token.is_empty() {
            return;
        }

        if token != *self.token.expose_secret() {
            debug!("token rotated");
            self.token = SecretString::new(token);
        }
    }

    pub(crate) fn ensure_authenticated(&self) -> Result<()> {
        if self.token.expose_secret().is_empty() {
            return Err(Error::Authentication {
                details: "session has no token".into(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct LoginData {
    #[serde(default)]
    accounts: Vec<Account>,
}

impl<T: Transport> Client<T> {
    /// Start a session.
    ///
    /// # Errors
    ///
    /// [`Error::Network`] if the portal cannot be reached,
    /// [`Error::Authentication`] if the credentials are rejected or no token
    /// is issued and [`Error::UnexpectedResponse`] if the reply is malformed.
    pub fn login(&self, username: &str, password: &SecretString) -> Result<Session> {
        self.login_with_response(username, password)
            .map(|(session, _)| session)
    }

    /// Like [`Client::login`], also returning the raw login response.
    ///
    /// # Errors
    ///
    /// See [`Client::login`].
    #[instrument(skip(self, password))]
    pub fn login_with_response(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<(Session, Value)> {
        let resource = Resource::Login;
        let payload = json!({
            "identifiant": username,
            "motdepasse": password.expose_secret(),
            "acceptationCharte": true,
        });

        let reply = self.send(&resource, "login.awp", None, &payload)?;

        if !(200..300).contains(&reply.status) {
            debug!(status = reply.status, "login rejected");
            return Err(Error::Authentication {
                details: format!("http status {}", reply.status),
            });
        }

        let raw: Value = serde_json::from_str(&reply.body)
            .map_err(|e| Error::unexpected(&resource, format!("invalid json: {e}")))?;
        let envelope: Envelope<Value> = serde_json::from_value(raw.clone())
            .map_err(|e| Error::unexpected(&resource, e.to_string()))?;

        if let Some(code) = envelope.code.filter(|&code| code != 200) {
            debug!(code, "bad credentials");
            return Err(Error::Authentication {
                details: envelope
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| format!("portal code {code}")),
            });
        }

        let token = envelope
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Authentication {
                details: "no token in login response".into(),
            })?;

        let data: LoginData = envelope
            .data
            .map(serde_json::from_value::<LoginData>)
            .transpose()
            .map_err(|e| Error::unexpected(&resource, e.to_string()))?
            .ok_or_else(|| Error::unexpected(&resource, "missing data"))?;

        let account = data
            .accounts
            .into_iter()
            .next()
            .ok_or_else(|| Error::unexpected(&resource, "no account in login response"))?;

        debug!(account = account.id, "logged in");

        Ok((Session::new(SecretString::new(token), account), raw))
    }
}
