use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, fixtures};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn rest_uri(token: &str, function: &str, extra: &str) -> String {
    format!(
        "/webservice/rest/server.php?wstoken={token}&moodlewsrestformat=json&wsfunction={function}{extra}"
    )
}

async fn get(app: Router, uri: &str) -> Value {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await
}

async fn call(function: &str, extra: &str) -> Value {
    get(app(), &rest_uri(fixtures::SEED_TOKEN, function, extra)).await
}

// --- login ---

#[tokio::test]
async fn login_issues_token() {
    let uri = format!(
        "/login/token.php?username={}&password={}&service=moodle_mobile_app",
        fixtures::SEED_USERNAME,
        fixtures::SEED_PASSWORD
    );
    let body = get(app(), &uri).await;
    assert_eq!(body["token"].as_str().unwrap().len(), 32);
    assert!(body.get("errorcode").is_none());
}

#[tokio::test]
async fn login_wrong_password_is_invalidlogin() {
    let body = get(
        app(),
        "/login/token.php?username=student&password=nope&service=moodle_mobile_app",
    )
    .await;
    assert_eq!(body["errorcode"], "invalidlogin");
    assert_eq!(body["error"], "Invalid login, please try again");
}

#[tokio::test]
async fn login_unknown_service_is_rejected() {
    let uri = format!(
        "/login/token.php?username={}&password={}&service=other",
        fixtures::SEED_USERNAME,
        fixtures::SEED_PASSWORD
    );
    assert_eq!(get(app(), &uri).await["errorcode"], "servicenotavailable");
}

// --- gateway ---

#[tokio::test]
async fn unknown_token_is_invalidtoken() {
    let body = get(app(), &rest_uri("nope", "core_webservice_get_site_info", "")).await;
    assert_eq!(body["errorcode"], "invalidtoken");
    assert_eq!(body["exception"], "moodle_exception");
}

#[tokio::test]
async fn unknown_function_is_invalidrecord() {
    let body = call("core_nothing_here", "").await;
    assert_eq!(body["errorcode"], "invalidrecord");
}

#[tokio::test]
async fn xml_format_is_rejected() {
    let uri = format!(
        "/webservice/rest/server.php?wstoken={}&wsfunction=core_webservice_get_site_info",
        fixtures::SEED_TOKEN
    );
    assert_eq!(get(app(), &uri).await["errorcode"], "invalidresponseformat");
}

#[tokio::test]
async fn site_info_describes_seeded_user() {
    let body = call("core_webservice_get_site_info", "").await;
    assert_eq!(body["username"], fixtures::SEED_USERNAME);
    assert_eq!(body["userid"], fixtures::SEED_USER_ID);
    assert_eq!(body["downloadfiles"], 1);
}

#[tokio::test]
async fn courses_by_classification() {
    let now = call(
        "core_course_get_enrolled_courses_by_timeline_classification",
        "&classification=inprogress",
    )
    .await;
    assert_eq!(now["courses"][0]["id"], fixtures::COURSE_ID);

    let past = call(
        "core_course_get_enrolled_courses_by_timeline_classification",
        "&classification=past",
    )
    .await;
    assert!(past["courses"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn attempts_default_to_finished() {
    let body = call("mod_quiz_get_user_attempts", "&quizid=10").await;
    let attempts = body["attempts"].as_array().unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0]["state"], "finished");
}

#[tokio::test]
async fn attempts_for_missing_quiz_is_invalidrecord() {
    let body = call("mod_quiz_get_user_attempts", "&quizid=999").await;
    assert_eq!(body["errorcode"], "invalidrecord");
}

#[tokio::test]
async fn review_of_finished_attempt() {
    let body = call(
        "mod_quiz_get_attempt_review",
        &format!("&attemptid={}", fixtures::FINISHED_ATTEMPT_ID),
    )
    .await;
    assert_eq!(body["grade"], "8.00");
    assert_eq!(body["questions"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn start_then_finish_attempt_shares_state() {
    let app = app();
    let started = get(
        app.clone(),
        &rest_uri(fixtures::SEED_TOKEN, "mod_quiz_start_attempt", "&quizid=10"),
    )
    .await;
    assert_eq!(started["attempt"]["state"], "inprogress");
    let id = started["attempt"]["id"].as_i64().unwrap();

    let review = get(
        app.clone(),
        &rest_uri(fixtures::SEED_TOKEN, "mod_quiz_get_attempt_review", &format!("&attemptid={id}")),
    )
    .await;
    assert_eq!(review["errorcode"], "noreview");

    let finished = get(
        app,
        &rest_uri(
            fixtures::SEED_TOKEN,
            "mod_quiz_process_attempt",
            &format!("&attemptid={id}&finishattempt=1&timeup=0"),
        ),
    )
    .await;
    assert_eq!(finished["state"], "finished");
}

#[tokio::test]
async fn grade_report_for_unknown_course() {
    let body = call("gradereport_user_get_grade_items", "&userid=2&courseid=1").await;
    assert_eq!(body["errorcode"], "invalidrecord");
}

#[tokio::test]
async fn grades_table_has_rows() {
    let body = call("gradereport_user_get_grades_table", "&userid=2&courseid=1111").await;
    assert!(body["tables"][0]["tabledata"].as_array().unwrap().len() > 3);
}

#[tokio::test]
async fn create_users_returns_ids() {
    let body = call(
        "core_user_create_users",
        "&users%5B0%5D%5Busername%5D=alice&users%5B0%5D%5Bfirstname%5D=Alice\
         &users%5B0%5D%5Blastname%5D=Liddell&users%5B0%5D%5Bemail%5D=alice%40test.edu\
         &users%5B0%5D%5Bcreatepassword%5D=1",
    )
    .await;
    assert_eq!(body[0]["username"], "alice");
    assert!(body[0]["id"].as_i64().unwrap() > fixtures::SEED_USER_ID);
}

#[tokio::test]
async fn create_users_requires_password_choice() {
    let body = call(
        "core_user_create_users",
        "&users%5B0%5D%5Busername%5D=bob&users%5B0%5D%5Bfirstname%5D=Bob\
         &users%5B0%5D%5Blastname%5D=B&users%5B0%5D%5Bemail%5D=bob%40test.edu",
    )
    .await;
    assert_eq!(body["errorcode"], "invalidparameter");
}
