//! Wire-level checks of the default transport against a wiremock server:
//! exact query parameters, status handling, cancellation and deadlines.

use std::time::Duration;

use moodle_core::{
    CallContext, ClientConfig, CourseClassification, Error, MoodleClient, NewUser, QueryParams,
};
use serde_json::{json, Value};
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REST: &str = "/webservice/rest/server.php";

fn client(server: &MockServer) -> MoodleClient {
    let config = ClientConfig::new(Url::parse(&server.uri()).unwrap())
        .with_token("test")
        .with_timeout(Duration::from_secs(5));
    MoodleClient::new(config).unwrap()
}

// ── Request encoding ─────────────────────────────────────────────────────

#[tokio::test]
async fn call_carries_fixed_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REST))
        .and(query_param("wstoken", "test"))
        .and(query_param("moodlewsrestformat", "json"))
        .and(query_param("wsfunction", "core_course_get_enrolled_courses_by_timeline_classification"))
        .and(query_param("classification", "inprogress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"courses": [], "nextoffset": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let courses = client(&server)
        .enrolled_courses_by_timeline_classification(&CallContext::background(), CourseClassification::InProgress)
        .await
        .unwrap();
    assert!(courses.is_empty());
}

#[tokio::test]
async fn caller_params_cannot_override_function_or_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REST))
        .and(query_param("wstoken", "test"))
        .and(query_param("wsfunction", "core_webservice_get_site_info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let params = QueryParams::new()
        .with("wsfunction", "core_user_create_users")
        .with("wstoken", "stolen");
    let _: Value = client(&server)
        .call(&CallContext::background(), "core_webservice_get_site_info", &params)
        .await
        .unwrap();
}

#[tokio::test]
async fn list_params_are_indexed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REST))
        .and(query_param("courseids[0]", "3"))
        .and(query_param("courseids[1]", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"quizzes": [], "warnings": []})))
        .expect(1)
        .mount(&server)
        .await;

    let quizzes = client(&server)
        .quizzes_by_courses(&CallContext::background(), &[3, 5])
        .await
        .unwrap();
    assert!(quizzes.is_empty());
}

#[tokio::test]
async fn finish_attempt_sends_flags() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REST))
        .and(query_param("wsfunction", "mod_quiz_process_attempt"))
        .and(query_param("attemptid", "42"))
        .and(query_param("finishattempt", "1"))
        .and(query_param("timeup", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "finished", "warnings": []})))
        .expect(1)
        .mount(&server)
        .await;

    let state = client(&server)
        .finish_attempt(&CallContext::background(), 42, true)
        .await
        .unwrap();
    assert_eq!(state, "finished");
}

#[tokio::test]
async fn create_users_flattens_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REST))
        .and(query_param("users[0][username]", "alice"))
        .and(query_param("users[0][password]", "Secret-1"))
        .and(query_param("users[1][username]", "bob"))
        .and(query_param("users[1][createpassword]", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 7, "username": "alice"},
            {"id": 8, "username": "bob"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let users = [
        NewUser::new("alice", "Alice", "L", "alice@test.edu").with_password("Secret-1"),
        NewUser::new("bob", "Bob", "B", "bob@test.edu").with_generated_password(),
    ];
    let created = client(&server)
        .create_users(&CallContext::background(), &users)
        .await
        .unwrap();
    assert_eq!(created.iter().map(|u| u.id).collect::<Vec<_>>(), vec![7, 8]);
}

#[tokio::test]
async fn login_hits_token_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login/token.php"))
        .and(query_param("username", "student"))
        .and(query_param("password", "p&ss=word"))
        .and(query_param("service", "moodle_mobile_app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "fresh", "privatetoken": null})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let res = client
        .login(&CallContext::background(), "student", "p&ss=word")
        .await
        .unwrap();
    assert_eq!(res.token, "fresh");
    assert_eq!(client.endpoint().token(), "fresh");
}

// ── Status handling ──────────────────────────────────────────────────────

#[tokio::test]
async fn undecodable_error_status_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REST))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client(&server).site_info(&CallContext::background()).await.unwrap_err();
    match err {
        Error::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn error_envelope_wins_over_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REST))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"errorcode": "dmlreadexception"})))
        .mount(&server)
        .await;

    let err = client(&server).site_info(&CallContext::background()).await.unwrap_err();
    assert_eq!(err.code(), "dmlreadexception");
}

#[tokio::test]
async fn warnings_fail_the_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REST))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "usergrades": [],
            "warnings": [{"item": "course", "itemid": 9, "warningcode": "notenrolled", "message": "not enrolled"}]
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .grade_items(&CallContext::background(), 2, 9)
        .await
        .unwrap_err();
    let warnings = err.warnings().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        err.to_string(),
        "item: course, itemID: 9, warningCode: notenrolled, message: not enrolled"
    );
}

// ── Cancellation and deadlines ───────────────────────────────────────────

#[tokio::test]
async fn deadline_cuts_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REST))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let ctx = CallContext::with_timeout(Duration::from_millis(100));
    let err = client(&server).site_info(&ctx).await.unwrap_err();
    assert!(matches!(err, Error::DeadlineExceeded), "{err:?}");
}

#[tokio::test]
async fn cancel_aborts_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REST))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = client(&server);
    let ctx = CallContext::background();
    let canceller = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            ctx.cancel();
        })
    };

    let started = tokio::time::Instant::now();
    let err = client.site_info(&ctx).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(4));
    canceller.await.unwrap();
}

#[tokio::test]
async fn transport_timeout_surfaces_as_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REST))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = ClientConfig::new(Url::parse(&server.uri()).unwrap())
        .with_token("test")
        .with_timeout(Duration::from_millis(100));
    let err = MoodleClient::new(config)
        .unwrap()
        .site_info(&CallContext::background())
        .await
        .unwrap_err();
    match err {
        Error::Transport(e) => assert!(e.is_timeout()),
        other => panic!("expected transport error, got {other:?}"),
    }
}
