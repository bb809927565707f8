mod common;

use chrono::NaiveDate;
use common::{logged_in, login_data, Scripted};
use ecoledirecte::{grades, homework, schedule, week::DateWindow, Client, Error};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

fn password() -> SecretString {
    SecretString::new("hunter2".into())
}

#[test]
fn login_sends_credentials() {
    let client = Client::with_transport(Scripted::default().ok("tok-1", login_data()));
    let session = client.login("jdoe", &password()).unwrap();

    assert_eq!(session.current_token().expose_secret(), "tok-1");
    assert_eq!(session.account().id, 4242);
    assert_eq!(session.account().first_name, "Jane");

    let calls = client.transport().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, "login.awp");
    assert!(calls[0].token.is_none());
    assert_eq!(
        calls[0].payload,
        json!({ "identifiant": "jdoe", "motdepasse": "hunter2", "acceptationCharte": true })
    );
}

#[test]
fn missing_token_is_an_authentication_error() {
    let client = Client::with_transport(
        Scripted::default().reply(200, json!({ "code": 200, "data": login_data() })),
    );

    let err = client.login("jdoe", &password()).unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }), "{err:?}");
}

#[test]
fn rejected_credentials() {
    let client = Client::with_transport(Scripted::default().reply(
        200,
        json!({ "code": 505, "token": "", "message": "Mot de passe invalide !", "data": {} }),
    ));

    match client.login("jdoe", &password()).unwrap_err() {
        Error::Authentication { details } => assert_eq!(details, "Mot de passe invalide !"),
        err => panic!("unexpected error: {err:?}"),
    }
}

#[test]
fn failing_http_status() {
    let client = Client::with_transport(Scripted::default().raw(503, "unavailable"));
    assert!(matches!(
        client.login("jdoe", &password()),
        Err(Error::Authentication { .. })
    ));
}

#[test]
fn network_failure() {
    let client = Client::with_transport(Scripted::default().fail("connection refused"));
    assert!(matches!(
        client.login("jdoe", &password()),
        Err(Error::Network { .. })
    ));
}

#[test]
fn malformed_login_response() {
    let client = Client::with_transport(Scripted::default().raw(200, "<html>maintenance</html>"));
    assert!(matches!(
        client.login("jdoe", &password()),
        Err(Error::UnexpectedResponse { .. })
    ));

    let client = Client::with_transport(Scripted::default().ok("tok", json!({ "accounts": [] })));
    assert!(matches!(
        client.login("jdoe", &password()),
        Err(Error::UnexpectedResponse { .. })
    ));
}

#[test]
fn tokens_rotate_across_resources() {
    let window = DateWindow::containing(NaiveDate::from_ymd_opt(2024, 3, 13).unwrap());
    let (client, mut session) = logged_in(
        "tok-1",
        Scripted::default()
            .ok("tok-2", json!([]))
            .ok("tok-3", json!({ "periodes": [], "notes": [] }))
            .ok("tok-4", json!({ "2024-03-14": [] }))
            .ok("tok-5", json!({ "date": "2024-03-14", "matieres": [] })),
    );

    schedule::fetch(&client, &mut session, &window).unwrap();
    grades::fetch(&client, &mut session, grades::Detail::Reduced).unwrap();
    homework::fetch(&client, &mut session, homework::Options::default()).unwrap();

    let tokens: Vec<_> = client
        .transport()
        .calls()
        .into_iter()
        .map(|c| c.token)
        .collect();

    assert_eq!(
        tokens,
        [
            None,
            Some("tok-1".to_owned()),
            Some("tok-2".to_owned()),
            Some("tok-3".to_owned()),
            Some("tok-4".to_owned()),
        ]
    );
    assert_eq!(session.current_token().expose_secret(), "tok-5");
}

#[test]
fn token_is_adopted_even_when_the_payload_is_rejected() {
    let (client, mut session) = logged_in(
        "tok-1",
        Scripted::default()
            .ok("tok-2", json!("not a grades object"))
            .ok("tok-3", json!({ "periodes": [], "notes": [] })),
    );

    assert!(matches!(
        grades::fetch(&client, &mut session, grades::Detail::Reduced),
        Err(Error::UnexpectedResponse { .. })
    ));
    assert_eq!(session.current_token().expose_secret(), "tok-2");

    grades::fetch(&client, &mut session, grades::Detail::Reduced).unwrap();
    assert_eq!(client.transport().calls()[2].token.as_deref(), Some("tok-2"));
}

#[test]
fn expired_token() {
    let (client, mut session) = logged_in(
        "tok-1",
        Scripted::default().reply(
            200,
            json!({ "code": 525, "token": "", "message": "Token invalide !", "data": {} }),
        ),
    );

    assert!(matches!(
        grades::fetch(&client, &mut session, grades::Detail::Reduced),
        Err(Error::Authentication { .. })
    ));
    assert_eq!(session.current_token().expose_secret(), "tok-1");
}

#[test]
fn empty_token_never_reaches_the_transport() {
    let client = Client::with_transport(Scripted::default());
    let mut session = ecoledirecte::Session::new(
        SecretString::new(String::new()),
        serde_json::from_value(login_data()["accounts"][0].clone()).unwrap(),
    );

    assert!(matches!(
        grades::fetch(&client, &mut session, grades::Detail::Reduced),
        Err(Error::Authentication { .. })
    ));
    assert!(client.transport().calls().is_empty());
}
