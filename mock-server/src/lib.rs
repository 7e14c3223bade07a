//! In-memory stand-in for a Moodle site's web service endpoints.
//!
//! Serves `/login/token.php` and `/webservice/rest/server.php` with the
//! same conventions as a real site: every answer is HTTP 200 and failures
//! are reported as a JSON error envelope keyed by `errorcode`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub mod fixtures;

use fixtures::{Account, Attempt, AttemptState, Site};

pub const LOGIN_SERVICE: &str = "moodle_mobile_app";

pub type Db = Arc<RwLock<Site>>;
type Params = HashMap<String, String>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Site::seeded()));
    Router::new()
        .route("/login/token.php", get(login))
        .route("/webservice/rest/server.php", get(rest).post(rest))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn error(exception: &str, code: &str, message: &str) -> Json<Value> {
    Json(json!({
        "exception": exception,
        "errorcode": code,
        "message": message,
    }))
}

fn invalid_parameter(detail: &str) -> Json<Value> {
    Json(json!({
        "exception": "invalid_parameter_exception",
        "errorcode": "invalidparameter",
        "message": "Invalid parameter value detected",
        "debuginfo": detail,
    }))
}

fn missing_record(table: &str) -> Json<Value> {
    error(
        "dml_missing_record_exception",
        "invalidrecord",
        &format!("Can't find data record in database table {table}."),
    )
}

fn int_param(params: &Params, key: &str) -> Result<i64, Json<Value>> {
    params
        .get(key)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| invalid_parameter(&format!("{key} => Invalid parameter value detected")))
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct LoginParams {
    pub username: String,
    pub password: String,
    pub service: String,
}

async fn login(State(db): State<Db>, Query(params): Query<LoginParams>) -> Json<Value> {
    let username = params.username.as_str();
    if params.service != LOGIN_SERVICE {
        return error(
            "moodle_exception",
            "servicenotavailable",
            "Web service is not available (it doesn't exist or might be disabled)",
        );
    }

    let mut site = db.write().await;
    let user_id = match site.accounts.get(username) {
        Some(account) if account.password == params.password => account.id,
        _ => {
            tracing::info!(username, "rejected login");
            return Json(json!({
                "error": "Invalid login, please try again",
                "errorcode": "invalidlogin",
                "stacktrace": null,
                "debuginfo": null,
                "reproductionlink": null,
            }));
        }
    };

    let token = Uuid::new_v4().simple().to_string();
    site.tokens.insert(token.clone(), user_id);
    tracing::info!(username, user_id, "issued token");
    Json(json!({ "token": token, "privatetoken": null }))
}

async fn rest(State(db): State<Db>, Query(params): Query<Params>) -> Json<Value> {
    let function = params.get("wsfunction").cloned().unwrap_or_default();
    tracing::debug!(function, "service call");

    if params.get("moodlewsrestformat").map(String::as_str) != Some("json") {
        return error(
            "moodle_exception",
            "invalidresponseformat",
            "Only the json response format is served",
        );
    }

    let token = params.get("wstoken").map(String::as_str).unwrap_or_default();
    let user_id = match db.read().await.tokens.get(token) {
        Some(id) => *id,
        None => {
            return error(
                "moodle_exception",
                "invalidtoken",
                "Invalid token - token not found",
            )
        }
    };

    let result = match function.as_str() {
        "core_webservice_get_site_info" => with_account(&db, user_id, fixtures::site_info).await,
        "core_course_get_enrolled_courses_by_timeline_classification" => enrolled_courses(&params),
        "mod_quiz_get_quizzes_by_courses" => Ok(quizzes_by_courses(&params)),
        "mod_quiz_get_user_attempts" => user_attempts(&db, user_id, &params).await,
        "mod_quiz_get_attempt_review" => attempt_review(&db, user_id, &params).await,
        "mod_quiz_start_attempt" => start_attempt(&db, user_id, &params).await,
        "mod_quiz_process_attempt" => process_attempt(&db, user_id, &params).await,
        "gradereport_user_get_grade_items" => grade_report(&db, &params, fixtures::grade_items).await,
        "gradereport_user_get_grades_table" => grade_report(&db, &params, fixtures::grades_table).await,
        "core_user_create_users" => create_users(&db, &params).await,
        _ => Err(missing_record("external_functions")),
    };

    match result {
        Ok(body) => Json(body),
        Err(error) => {
            tracing::debug!(function, code = %error.0["errorcode"], "service error");
            error
        }
    }
}

type Reply = Result<Value, Json<Value>>;

async fn with_account(db: &Db, user_id: i64, render: fn(&Account) -> Value) -> Reply {
    let site = db.read().await;
    let account = site.account_by_id(user_id).ok_or_else(|| missing_record("user"))?;
    Ok(render(account))
}

fn enrolled_courses(params: &Params) -> Reply {
    let courses = match params.get("classification").map(String::as_str) {
        Some("inprogress") | Some("all") => vec![fixtures::course()],
        Some("past") | Some("future") => Vec::new(),
        _ => return Err(invalid_parameter("classification => Invalid parameter value detected")),
    };
    Ok(json!({ "courses": courses, "nextoffset": courses.len() }))
}

fn indexed(params: &Params, key: &str) -> Vec<String> {
    (0..)
        .map_while(|i| params.get(&format!("{key}[{i}]")).cloned())
        .collect()
}

fn quizzes_by_courses(params: &Params) -> Value {
    let course_ids = indexed(params, "courseids");
    let wanted = course_ids.is_empty()
        || course_ids
            .iter()
            .any(|id| id.parse::<i64>().ok() == Some(fixtures::COURSE_ID));
    let quizzes = if wanted { vec![fixtures::quiz()] } else { Vec::new() };
    json!({ "quizzes": quizzes, "warnings": [] })
}

fn check_quiz(quiz_id: i64) -> Result<(), Json<Value>> {
    if quiz_id == fixtures::QUIZ_ID {
        Ok(())
    } else {
        Err(missing_record("quiz"))
    }
}

async fn user_attempts(db: &Db, user_id: i64, params: &Params) -> Reply {
    let quiz_id = int_param(params, "quizid")?;
    check_quiz(quiz_id)?;
    let status = params.get("status").map(String::as_str).unwrap_or("finished");

    let site = db.read().await;
    let attempts: Vec<Value> = site
        .attempts
        .iter()
        .filter(|a| a.quiz == quiz_id && a.user_id == user_id)
        .filter(|a| match status {
            "all" => true,
            "unfinished" => a.state == AttemptState::InProgress,
            _ => a.state == AttemptState::Finished,
        })
        .map(fixtures::attempt)
        .collect();
    Ok(json!({ "attempts": attempts, "warnings": [] }))
}

fn own_attempt<'a>(site: &'a mut Site, user_id: i64, attempt_id: i64) -> Result<&'a mut Attempt, Json<Value>> {
    site.attempts
        .iter_mut()
        .find(|a| a.id == attempt_id && a.user_id == user_id)
        .ok_or_else(|| missing_record("quiz_attempts"))
}

async fn attempt_review(db: &Db, user_id: i64, params: &Params) -> Reply {
    let attempt_id = int_param(params, "attemptid")?;
    let mut site = db.write().await;
    let attempt = own_attempt(&mut site, user_id, attempt_id)?;
    if attempt.state != AttemptState::Finished {
        return Err(error(
            "moodle_quiz_exception",
            "noreview",
            "You are not allowed to review this attempt.",
        ));
    }
    let grade = attempt.sum_grades.map(|g| format!("{:.2}", g * 2.0));
    Ok(json!({
        "grade": grade,
        "attempt": fixtures::attempt(attempt),
        "additionaldata": [],
        "questions": fixtures::questions(attempt),
        "warnings": [],
    }))
}

async fn start_attempt(db: &Db, user_id: i64, params: &Params) -> Reply {
    let quiz_id = int_param(params, "quizid")?;
    check_quiz(quiz_id)?;

    let mut site = db.write().await;
    let states: Vec<AttemptState> = site
        .attempts
        .iter()
        .filter(|a| a.quiz == quiz_id && a.user_id == user_id)
        .map(|a| a.state)
        .collect();
    if states.contains(&AttemptState::InProgress) {
        return Err(error(
            "moodle_quiz_exception",
            "attemptstillinprogress",
            "Cannot start a new attempt while another one is still in progress.",
        ));
    }
    let number = states.len() as i64 + 1;

    let attempt = Attempt {
        id: site.next_attempt_id,
        quiz: quiz_id,
        user_id,
        number,
        state: AttemptState::InProgress,
        time_start: fixtures::NOW + 3600,
        time_finish: 0,
        sum_grades: None,
    };
    site.next_attempt_id += 1;
    let body = json!({ "attempt": fixtures::attempt(&attempt), "messages": [], "warnings": [] });
    site.attempts.push(attempt);
    Ok(body)
}

async fn process_attempt(db: &Db, user_id: i64, params: &Params) -> Reply {
    let attempt_id = int_param(params, "attemptid")?;
    let finish = params.get("finishattempt").map(String::as_str) == Some("1");
    let time_up = params.get("timeup").map(String::as_str) == Some("1");

    let mut site = db.write().await;
    let attempt = own_attempt(&mut site, user_id, attempt_id)?;
    if finish && attempt.state == AttemptState::InProgress {
        attempt.state = AttemptState::Finished;
        attempt.time_finish = attempt.time_start + if time_up { 1800 } else { 600 };
        attempt.sum_grades = Some(if time_up { 2.0 } else { 5.0 });
    }
    Ok(json!({ "state": attempt.state.as_str(), "warnings": [] }))
}

async fn grade_report(db: &Db, params: &Params, render: fn(&Account) -> Value) -> Reply {
    let user_id = int_param(params, "userid")?;
    let course_id = int_param(params, "courseid")?;
    if course_id != fixtures::COURSE_ID {
        return Err(missing_record("course"));
    }
    with_account(db, user_id, render).await
}

async fn create_users(db: &Db, params: &Params) -> Reply {
    let mut site = db.write().await;
    let mut created = Vec::new();

    for i in 0.. {
        let field = |name: &str| params.get(&format!("users[{i}][{name}]")).cloned();
        let Some(username) = field("username") else {
            break;
        };
        let (Some(first_name), Some(last_name), Some(email)) =
            (field("firstname"), field("lastname"), field("email"))
        else {
            return Err(invalid_parameter(&format!("users => Missing required key in single structure: {i}")));
        };
        if site.accounts.contains_key(&username) {
            return Err(invalid_parameter(&format!("Username already exists: {username}")));
        }
        let password = match (field("password"), field("createpassword").as_deref()) {
            (Some(password), _) => password,
            (None, Some("1")) => Uuid::new_v4().simple().to_string(),
            (None, _) => return Err(invalid_parameter("Invalid password: you must provide a password")),
        };

        let account = Account {
            id: site.next_user_id,
            username: username.clone(),
            password,
            first_name,
            last_name,
            email,
        };
        site.next_user_id += 1;
        created.push(json!({ "id": account.id, "username": username }));
        site.accounts.insert(username, account);
    }

    tracing::info!(count = created.len(), "created users");
    Ok(Value::Array(created))
}
