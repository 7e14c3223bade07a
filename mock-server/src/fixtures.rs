//! Seed data for the mock site: one course with one quiz, one student with a
//! finished attempt, and that student's grade report.

use std::collections::HashMap;

use serde_json::{json, Value};

pub const SEED_TOKEN: &str = "test-token";
pub const SEED_USERNAME: &str = "student";
pub const SEED_PASSWORD: &str = "Password-1";
pub const SEED_USER_ID: i64 = 2;
pub const COURSE_ID: i64 = 1111;
pub const QUIZ_ID: i64 = 10;
pub const FINISHED_ATTEMPT_ID: i64 = 100;

/// Fixed "now" so responses are reproducible.
pub const NOW: i64 = 1_577_836_800;

pub const FUNCTIONS: &[&str] = &[
    "core_webservice_get_site_info",
    "core_course_get_enrolled_courses_by_timeline_classification",
    "mod_quiz_get_quizzes_by_courses",
    "mod_quiz_get_user_attempts",
    "mod_quiz_get_attempt_review",
    "mod_quiz_start_attempt",
    "mod_quiz_process_attempt",
    "gradereport_user_get_grade_items",
    "gradereport_user_get_grades_table",
    "core_user_create_users",
];

#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct Attempt {
    pub id: i64,
    pub quiz: i64,
    pub user_id: i64,
    pub number: i64,
    pub state: AttemptState,
    pub time_start: i64,
    pub time_finish: i64,
    pub sum_grades: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    InProgress,
    Finished,
}

impl AttemptState {
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptState::InProgress => "inprogress",
            AttemptState::Finished => "finished",
        }
    }
}

/// Everything the mock site knows. Lives behind the router's lock.
#[derive(Debug)]
pub struct Site {
    pub accounts: HashMap<String, Account>,
    pub tokens: HashMap<String, i64>,
    pub attempts: Vec<Attempt>,
    pub next_user_id: i64,
    pub next_attempt_id: i64,
}

impl Site {
    pub fn seeded() -> Self {
        let student = Account {
            id: SEED_USER_ID,
            username: SEED_USERNAME.to_string(),
            password: SEED_PASSWORD.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: "student@test.edu".to_string(),
        };
        Self {
            accounts: HashMap::from([(student.username.clone(), student)]),
            tokens: HashMap::from([(SEED_TOKEN.to_string(), SEED_USER_ID)]),
            attempts: vec![Attempt {
                id: FINISHED_ATTEMPT_ID,
                quiz: QUIZ_ID,
                user_id: SEED_USER_ID,
                number: 1,
                state: AttemptState::Finished,
                time_start: NOW,
                time_finish: NOW + 300,
                sum_grades: Some(4.0),
            }],
            next_user_id: SEED_USER_ID + 1,
            next_attempt_id: FINISHED_ATTEMPT_ID + 1,
        }
    }

    pub fn account_by_id(&self, id: i64) -> Option<&Account> {
        self.accounts.values().find(|a| a.id == id)
    }
}

pub fn site_info(account: &Account) -> Value {
    json!({
        "sitename": "Mock Moodle",
        "username": account.username,
        "firstname": account.first_name,
        "lastname": account.last_name,
        "fullname": format!("{} {}", account.first_name, account.last_name),
        "lang": "en",
        "userid": account.id,
        "siteurl": "https://test.edu",
        "userpictureurl": format!("https://test.edu/pluginfile.php/{}/user/icon/f1", account.id),
        "functions": FUNCTIONS
            .iter()
            .map(|name| json!({"name": name, "version": "2019052009"}))
            .collect::<Vec<_>>(),
        "downloadfiles": 1,
        "uploadfiles": 0,
        "release": "3.7.9 (Build: 20201109)",
        "version": "2019052009",
        "mobilecssurl": "",
        "advancedfeatures": [
            {"name": "usecomments", "value": 1},
            {"name": "enableblogs", "value": 0}
        ],
        "usercanmanageownfiles": true,
        "userquota": 104857600,
        "usermaxuploadfilesize": 104857600,
        "userhomepage": 1,
        "siteid": 1,
        "sitecalendartype": "gregorian",
        "usercalendartype": "gregorian",
        "theme": "boost"
    })
}

pub fn course() -> Value {
    json!({
        "id": COURSE_ID,
        "fullname": "MATH 1111 Introduction to Math",
        "shortname": "MATH 1111",
        "idnumber": "",
        "summary": "<p>Basic concepts in mathematics</p>",
        "summaryformat": 1,
        "startdate": NOW,
        "enddate": NOW + 86400 * 120,
        "visible": true,
        "fullnamedisplay": "MATH 1111 Introduction to Math",
        "viewurl": format!("https://test.edu/course/view.php?id={COURSE_ID}"),
        "courseimage": "",
        "progress": 40,
        "hasprogress": true,
        "isfavourite": false,
        "hidden": false,
        "showshortname": false,
        "coursecategory": "Current Term"
    })
}

pub fn quiz() -> Value {
    json!({
        "id": QUIZ_ID,
        "course": COURSE_ID,
        "coursemodule": 501,
        "name": "Week 1 Quiz",
        "intro": "",
        "introformat": 1,
        "timeopen": 0,
        "timeclose": NOW + 86400 * 7,
        "timelimit": 1800,
        "preferredbehaviour": "deferredfeedback",
        "attempts": 0,
        "grademethod": 1,
        "decimalpoints": 2,
        "questiondecimalpoints": -1,
        "sumgrades": 5,
        "grade": 10,
        "hasfeedback": 0,
        "section": 1,
        "visible": 1,
        "groupmode": 0,
        "groupingid": 0
    })
}

pub fn attempt(attempt: &Attempt) -> Value {
    let modified = if attempt.time_finish > 0 {
        attempt.time_finish
    } else {
        attempt.time_start
    };
    json!({
        "id": attempt.id,
        "quiz": attempt.quiz,
        "userid": attempt.user_id,
        "attempt": attempt.number,
        "uniqueid": attempt.id * 10,
        "layout": "1,2,0",
        "currentpage": 0,
        "preview": 0,
        "state": attempt.state.as_str(),
        "timestart": attempt.time_start,
        "timefinish": attempt.time_finish,
        "timemodified": modified,
        "timemodifiedoffline": 0,
        "timecheckstate": null,
        "sumgrades": attempt.sum_grades.map(|g| format!("{g:.5}"))
    })
}

pub fn questions(attempt: &Attempt) -> Value {
    let time = attempt.time_finish;
    json!([
        {
            "slot": 1,
            "type": "multichoice",
            "page": 0,
            "html": "<div class=\"que multichoice\">What is 2 + 2?</div>",
            "sequencecheck": 3,
            "lastactiontime": time,
            "hasautosavedstep": false,
            "flagged": false,
            "number": 1,
            "state": "gradedright",
            "status": "Correct",
            "blockedbyprevious": false,
            "mark": "2.00",
            "maxmark": 2
        },
        {
            "slot": 2,
            "type": "description",
            "page": 0,
            "html": "<div class=\"que description\">End of quiz</div>",
            "sequencecheck": 1,
            "lastactiontime": time,
            "hasautosavedstep": false,
            "flagged": false,
            "state": "",
            "status": "",
            "blockedbyprevious": false,
            "mark": "",
            "maxmark": 0
        }
    ])
}

pub fn grade_items(account: &Account) -> Value {
    json!({
        "usergrades": [{
            "courseid": COURSE_ID,
            "userid": account.id,
            "userfullname": format!("{} {}", account.first_name, account.last_name),
            "maxdepth": 2,
            "gradeitems": [
                {
                    "id": 9001,
                    "itemname": "Week 1 Quiz",
                    "itemtype": "mod",
                    "itemmodule": "quiz",
                    "iteminstance": QUIZ_ID,
                    "itemnumber": 0,
                    "categoryid": 70,
                    "outcomeid": null,
                    "scaleid": null,
                    "locked": false,
                    "cmid": 501,
                    "graderaw": 8,
                    "gradedatesubmitted": NOW + 300,
                    "gradedategraded": NOW + 300,
                    "gradehiddenbydate": false,
                    "gradeneedsupdate": false,
                    "gradeishidden": false,
                    "gradeislocked": false,
                    "gradeisoverridden": false,
                    "gradeformatted": "8.00",
                    "grademin": 0,
                    "grademax": 10,
                    "rangeformatted": "0&ndash;10",
                    "feedback": "",
                    "feedbackformat": 1
                },
                {
                    "id": 9000,
                    "itemname": null,
                    "itemtype": "course",
                    "itemmodule": null,
                    "iteminstance": COURSE_ID,
                    "itemnumber": null,
                    "categoryid": null,
                    "outcomeid": null,
                    "scaleid": null,
                    "locked": null,
                    "cmid": null,
                    "graderaw": null,
                    "gradedatesubmitted": null,
                    "gradedategraded": 0,
                    "gradehiddenbydate": false,
                    "gradeneedsupdate": false,
                    "gradeishidden": false,
                    "gradeislocked": null,
                    "gradeisoverridden": null,
                    "gradeformatted": "-",
                    "grademin": 0,
                    "grademax": 100,
                    "rangeformatted": "0&ndash;100",
                    "feedback": "",
                    "feedbackformat": 0
                }
            ]
        }],
        "warnings": []
    })
}

fn cell(content: &str) -> Value {
    json!({"class": "column", "content": content})
}

pub fn grades_table(account: &Account) -> Value {
    json!({
        "tables": [{
            "courseid": COURSE_ID,
            "userid": account.id,
            "userfullname": format!("{} {}", account.first_name, account.last_name),
            "maxdepth": 2,
            "tabledata": [
                {
                    "itemname": {"class": "level1 column-itemname", "colspan": 5, "content": "MATH 1111", "celltype": "th"},
                    "leader": {"class": "level1 column-leader", "rowspan": 4}
                },
                {
                    "itemname": {"class": "level2 column-itemname", "colspan": 4, "content": "<img alt=\"Category\" />Quizzes", "celltype": "th"},
                    "leader": {"class": "level2 column-leader", "rowspan": 2}
                },
                [],
                {
                    "itemname": {
                        "class": "level3 column-itemname",
                        "content": "<a title=\"Week 1 Quiz\" href=\"https://test.edu/mod/quiz/view.php?id=501\">Week 1 Quiz</a>",
                        "celltype": "th"
                    },
                    "grade": cell("8.00"),
                    "range": cell("0&ndash;10"),
                    "feedback": cell("<p>Well done</p>"),
                    "contributiontocoursetotal": cell("8.00 %")
                },
                {
                    "itemname": {"class": "level3 column-itemname", "content": "Week 2 Quiz", "celltype": "th"},
                    "grade": cell("-"),
                    "range": cell("0&ndash;10"),
                    "feedback": cell("&nbsp;"),
                    "contributiontocoursetotal": cell("0.00 %")
                },
                {
                    "itemname": {"class": "level1 column-itemname", "content": "<span>Course total</span>", "celltype": "th"},
                    "grade": cell("8.00"),
                    "range": cell("0&ndash;100"),
                    "feedback": cell("&nbsp;"),
                    "contributiontocoursetotal": cell("-")
                }
            ]
        }],
        "warnings": []
    })
}
