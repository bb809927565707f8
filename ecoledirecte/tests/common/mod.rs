#![allow(dead_code)]

use std::{cell::RefCell, collections::VecDeque};

use ecoledirecte::{Client, Reply, Request, Transport, TransportError};
use secrecy::ExposeSecret;
use serde_json::{json, Value};

/// A request as seen by the transport.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub token: Option<String>,
    pub payload: Value,
}

/// Replays canned replies in order and records every request.
#[derive(Debug, Default)]
pub struct Scripted {
    replies: RefCell<VecDeque<Result<Reply, String>>>,
    calls: RefCell<Vec<Recorded>>,
}

impl Scripted {
    pub fn reply(self, status: u16, body: Value) -> Self {
        self.replies.borrow_mut().push_back(Ok(Reply {
            status,
            body: body.to_string(),
        }));
        self
    }

    pub fn ok(self, token: &str, data: Value) -> Self {
        self.reply(200, json!({ "code": 200, "token": token, "message": "", "data": data }))
    }

    pub fn raw(self, status: u16, body: &str) -> Self {
        self.replies.borrow_mut().push_back(Ok(Reply {
            status,
            body: body.to_owned(),
        }));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.replies.borrow_mut().push_back(Err(message.to_owned()));
        self
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }
}

impl Transport for Scripted {
    fn post(&self, request: Request<'_>) -> Result<Reply, TransportError> {
        self.calls.borrow_mut().push(Recorded {
            path: request.path.to_owned(),
            token: request.token.map(|t| t.expose_secret().clone()),
            payload: request.payload.clone(),
        });

        match self.replies.borrow_mut().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(message.into()),
            None => Err("no scripted reply left".into()),
        }
    }
}

pub fn login_data() -> Value {
    json!({
        "accounts": [{
            "id": 4242,
            "identifiant": "jdoe",
            "prenom": "Jane",
            "nom": "DOE",
            "typeCompte": "E",
            "modules": []
        }]
    })
}

/// A client whose first reply is a successful login issuing `token`.
pub fn logged_in(token: &str, script: Scripted) -> (Client<Scripted>, ecoledirecte::Session) {
    let mut replies = Scripted::default().ok(token, login_data());
    replies.replies.get_mut().extend(script.replies.into_inner());

    let client = Client::with_transport(replies);
    let session = client
        .login("jdoe", &secrecy::SecretString::new("hunter2".into()))
        .unwrap();
    (client, session)
}
