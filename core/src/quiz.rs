//! Quizzes and quiz attempts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::Envelope;
use crate::client::MoodleClient;
use crate::context::CallContext;
use crate::convert::{self, IntoDomain};
use crate::error::{Error, MappingError};
use crate::query::{self, QueryParams};
use crate::transport::Transport;
use crate::warning::Warnings;

pub const GET_QUIZZES_BY_COURSES: &str = "mod_quiz_get_quizzes_by_courses";
pub const GET_USER_ATTEMPTS: &str = "mod_quiz_get_user_attempts";
pub const GET_ATTEMPT_REVIEW: &str = "mod_quiz_get_attempt_review";
pub const START_ATTEMPT: &str = "mod_quiz_start_attempt";
pub const PROCESS_ATTEMPT: &str = "mod_quiz_process_attempt";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quiz {
    pub id: i64,
    pub course_id: i64,
    pub course_module_id: i64,
    pub name: String,
    pub intro: String,
    pub intro_format: i64,
    /// `None` when the quiz has no opening restriction.
    pub time_open: Option<DateTime<Utc>>,
    /// `None` when the quiz has no closing restriction.
    pub time_close: Option<DateTime<Utc>>,
    /// Seconds; zero means unlimited.
    pub time_limit: i64,
    pub preferred_behaviour: String,
    pub attempts: i64,
    pub grade_method: i64,
    pub decimal_points: i64,
    pub question_decimal_points: i64,
    pub sum_grades: f64,
    pub grade: f64,
    pub has_feedback: bool,
    pub section: i64,
    pub visible: bool,
    pub group_mode: i64,
    pub grouping_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub quiz_id: i64,
    pub user_id: i64,
    pub attempt: i64,
    pub unique_id: i64,
    pub layout: String,
    pub current_page: i64,
    pub preview: bool,
    pub state: String,
    pub time_start: DateTime<Utc>,
    pub time_finish: Option<DateTime<Utc>>,
    pub time_modified: DateTime<Utc>,
    pub time_modified_offline: DateTime<Utc>,
    pub time_check_state: Option<DateTime<Utc>>,
    pub sum_grades: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizQuestion {
    pub slot: i64,
    pub kind: String,
    pub page: i64,
    pub html_raw: String,
    pub sequence_check: i64,
    pub last_action_time: DateTime<Utc>,
    pub has_autosaved_step: bool,
    pub flagged: bool,
    pub number: Option<i64>,
    pub state: String,
    pub status: String,
    pub blocked_by_previous: bool,
    pub mark: String,
    pub max_mark: f64,
}

/// A finished attempt with its grade and per-question detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptReview {
    pub grade: Option<f64>,
    pub attempt: QuizAttempt,
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct QuizWire {
    id: i64,
    course: i64,
    coursemodule: i64,
    name: String,
    intro: String,
    introformat: i64,
    timeopen: i64,
    timeclose: i64,
    timelimit: i64,
    preferredbehaviour: String,
    attempts: i64,
    grademethod: i64,
    decimalpoints: i64,
    questiondecimalpoints: i64,
    sumgrades: f64,
    grade: f64,
    hasfeedback: i64,
    section: i64,
    visible: i64,
    groupmode: i64,
    groupingid: i64,
}

impl IntoDomain for QuizWire {
    type Domain = Quiz;

    fn into_domain(self) -> Result<Quiz, MappingError> {
        Ok(Quiz {
            id: self.id,
            course_id: self.course,
            course_module_id: self.coursemodule,
            name: self.name,
            intro: self.intro,
            intro_format: self.introformat,
            time_open: convert::optional_epoch(Some(self.timeopen))?,
            time_close: convert::optional_epoch(Some(self.timeclose))?,
            time_limit: self.timelimit,
            preferred_behaviour: self.preferredbehaviour,
            attempts: self.attempts,
            grade_method: self.grademethod,
            decimal_points: self.decimalpoints,
            question_decimal_points: self.questiondecimalpoints,
            sum_grades: self.sumgrades,
            grade: self.grade,
            has_feedback: convert::bit(self.hasfeedback),
            section: self.section,
            visible: convert::bit(self.visible),
            group_mode: self.groupmode,
            grouping_id: self.groupingid,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct QuizAttemptWire {
    id: i64,
    quiz: i64,
    userid: i64,
    attempt: i64,
    uniqueid: i64,
    layout: String,
    currentpage: i64,
    preview: i64,
    state: String,
    timestart: i64,
    timefinish: i64,
    timemodified: i64,
    timemodifiedoffline: i64,
    timecheckstate: Option<i64>,
    #[serde(deserialize_with = "convert::lenient_f64")]
    sumgrades: Option<f64>,
}

impl IntoDomain for QuizAttemptWire {
    type Domain = QuizAttempt;

    fn into_domain(self) -> Result<QuizAttempt, MappingError> {
        Ok(QuizAttempt {
            id: self.id,
            quiz_id: self.quiz,
            user_id: self.userid,
            attempt: self.attempt,
            unique_id: self.uniqueid,
            layout: self.layout,
            current_page: self.currentpage,
            preview: convert::bit(self.preview),
            state: self.state,
            time_start: convert::epoch(self.timestart)?,
            time_finish: convert::optional_epoch(Some(self.timefinish))?,
            time_modified: convert::epoch(self.timemodified)?,
            time_modified_offline: convert::epoch(self.timemodifiedoffline)?,
            time_check_state: convert::optional_epoch(self.timecheckstate)?,
            sum_grades: self.sumgrades,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct QuizQuestionWire {
    slot: i64,
    #[serde(rename = "type")]
    kind: String,
    page: i64,
    html: String,
    sequencecheck: i64,
    lastactiontime: i64,
    hasautosavedstep: bool,
    flagged: bool,
    number: Option<i64>,
    state: String,
    status: String,
    blockedbyprevious: bool,
    mark: String,
    maxmark: f64,
}

impl IntoDomain for QuizQuestionWire {
    type Domain = QuizQuestion;

    fn into_domain(self) -> Result<QuizQuestion, MappingError> {
        Ok(QuizQuestion {
            slot: self.slot,
            kind: self.kind,
            page: self.page,
            html_raw: self.html,
            sequence_check: self.sequencecheck,
            last_action_time: convert::epoch(self.lastactiontime)?,
            has_autosaved_step: self.hasautosavedstep,
            flagged: self.flagged,
            number: self.number,
            state: self.state,
            status: self.status,
            blocked_by_previous: self.blockedbyprevious,
            mark: self.mark,
            max_mark: self.maxmark,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct QuizzesWire {
    quizzes: Vec<QuizWire>,
    warnings: Warnings,
}

impl Envelope for QuizzesWire {
    fn warnings(&self) -> Option<&Warnings> {
        Some(&self.warnings)
    }
}

impl IntoDomain for QuizzesWire {
    type Domain = Vec<Quiz>;

    fn into_domain(self) -> Result<Vec<Quiz>, MappingError> {
        self.quizzes.into_domain()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct AttemptsWire {
    attempts: Vec<QuizAttemptWire>,
    warnings: Warnings,
}

impl Envelope for AttemptsWire {
    fn warnings(&self) -> Option<&Warnings> {
        Some(&self.warnings)
    }
}

impl IntoDomain for AttemptsWire {
    type Domain = Vec<QuizAttempt>;

    fn into_domain(self) -> Result<Vec<QuizAttempt>, MappingError> {
        self.attempts.into_domain()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct AttemptReviewWire {
    #[serde(deserialize_with = "convert::lenient_f64")]
    grade: Option<f64>,
    attempt: QuizAttemptWire,
    questions: Vec<QuizQuestionWire>,
    warnings: Warnings,
}

impl Envelope for AttemptReviewWire {
    fn warnings(&self) -> Option<&Warnings> {
        Some(&self.warnings)
    }
}

impl IntoDomain for AttemptReviewWire {
    type Domain = AttemptReview;

    fn into_domain(self) -> Result<AttemptReview, MappingError> {
        Ok(AttemptReview {
            grade: self.grade,
            attempt: self.attempt.into_domain()?,
            questions: self.questions.into_domain()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct StartAttemptWire {
    attempt: QuizAttemptWire,
    warnings: Warnings,
}

impl Envelope for StartAttemptWire {
    fn warnings(&self) -> Option<&Warnings> {
        Some(&self.warnings)
    }
}

impl IntoDomain for StartAttemptWire {
    type Domain = QuizAttempt;

    fn into_domain(self) -> Result<QuizAttempt, MappingError> {
        self.attempt.into_domain()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ProcessAttemptWire {
    state: String,
    warnings: Warnings,
}

impl Envelope for ProcessAttemptWire {
    fn warnings(&self) -> Option<&Warnings> {
        Some(&self.warnings)
    }
}

impl<T: Transport> MoodleClient<T> {
    pub async fn quizzes_by_courses(
        &self,
        ctx: &CallContext,
        course_ids: &[i64],
    ) -> Result<Vec<Quiz>, Error> {
        let params = QueryParams::indexed("courseids", course_ids);
        self.call_mapped::<QuizzesWire>(ctx, GET_QUIZZES_BY_COURSES, &params)
            .await
    }

    /// All of the current user's attempts at `quiz_id`, finished or not.
    pub async fn user_attempts(
        &self,
        ctx: &CallContext,
        quiz_id: i64,
    ) -> Result<Vec<QuizAttempt>, Error> {
        let params = QueryParams::new()
            .with("quizid", quiz_id)
            .with("status", "all");
        self.call_mapped::<AttemptsWire>(ctx, GET_USER_ATTEMPTS, &params)
            .await
    }

    pub async fn attempt_review(
        &self,
        ctx: &CallContext,
        attempt_id: i64,
    ) -> Result<AttemptReview, Error> {
        let params = QueryParams::new().with("attemptid", attempt_id);
        self.call_mapped::<AttemptReviewWire>(ctx, GET_ATTEMPT_REVIEW, &params)
            .await
    }

    pub async fn start_attempt(&self, ctx: &CallContext, quiz_id: i64) -> Result<QuizAttempt, Error> {
        let params = QueryParams::new().with("quizid", quiz_id);
        self.call_mapped::<StartAttemptWire>(ctx, START_ATTEMPT, &params)
            .await
    }

    /// Submit `attempt_id` for grading. Returns the attempt's new state.
    pub async fn finish_attempt(
        &self,
        ctx: &CallContext,
        attempt_id: i64,
        time_up: bool,
    ) -> Result<String, Error> {
        let params = QueryParams::new()
            .with("attemptid", attempt_id)
            .with("finishattempt", query::bit(true))
            .with("timeup", query::bit(time_up));
        let res: ProcessAttemptWire = self.call(ctx, PROCESS_ATTEMPT, &params).await?;
        Ok(res.state)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::classify::classify;

    fn decode<E: Envelope + IntoDomain>(body: &str) -> Result<E::Domain, Error> {
        let envelope = classify::<E>(body.as_bytes())?.into_result()?;
        Ok(envelope.into_domain()?)
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, h, m, 0).unwrap()
    }

    const ATTEMPT: &str = r#"{
    "id": 2222,
    "quiz": 1111,
    "userid": 3333,
    "attempt": 1,
    "uniqueid": 123456,
    "layout": "1,2,3,4,5,0",
    "currentpage": 0,
    "preview": 0,
    "state": "finished",
    "timestart": 1577836800,
    "timefinish": 1577837100,
    "timemodified": 1577837400,
    "timemodifiedoffline": 1577837700,
    "timecheckstate": null,
    "sumgrades": null
  }"#;

    fn finished_attempt() -> QuizAttempt {
        QuizAttempt {
            id: 2222,
            quiz_id: 1111,
            user_id: 3333,
            attempt: 1,
            unique_id: 123456,
            layout: "1,2,3,4,5,0".to_string(),
            current_page: 0,
            preview: false,
            state: "finished".to_string(),
            time_start: at(0, 0),
            time_finish: Some(at(0, 5)),
            time_modified: at(0, 10),
            time_modified_offline: at(0, 15),
            time_check_state: None,
            sum_grades: None,
        }
    }

    #[test]
    fn maps_quizzes() {
        let body = r#"{
  "quizzes": [
    {
      "id": 2222,
      "course": 1111,
      "coursemodule": 123456,
      "name": "Quiz 1",
      "intro": "<p>This is a test quiz.<\/p>",
      "introformat": 1,
      "introfiles": [],
      "timeopen": 1577836800,
      "timeclose": 0,
      "timelimit": 0,
      "preferredbehaviour": "deferredfeedback",
      "attempts": 0,
      "grademethod": 1,
      "decimalpoints": 2,
      "questiondecimalpoints": -1,
      "sumgrades": 5,
      "grade": 100,
      "hasfeedback": 0,
      "section": 1,
      "visible": 1,
      "groupmode": 1,
      "groupingid": 0
    }
  ],
  "warnings": []
}"#;
        let quizzes = decode::<QuizzesWire>(body).unwrap();
        assert_eq!(quizzes.len(), 1);
        let quiz = &quizzes[0];
        assert_eq!(quiz.id, 2222);
        assert_eq!(quiz.course_id, 1111);
        assert_eq!(quiz.intro, "<p>This is a test quiz.</p>");
        assert_eq!(quiz.time_open, Some(at(0, 0)));
        assert_eq!(quiz.time_close, None);
        assert_eq!(quiz.question_decimal_points, -1);
        assert_eq!(quiz.grade, 100.0);
        assert!(quiz.visible);
        assert!(!quiz.has_feedback);
    }

    #[test]
    fn maps_user_attempts() {
        let body = format!(r#"{{"attempts":[{ATTEMPT}],"warnings":[]}}"#);
        let attempts = decode::<AttemptsWire>(&body).unwrap();
        assert_eq!(attempts, vec![finished_attempt()]);
    }

    #[test]
    fn unfinished_attempt_has_no_finish_time() {
        let body = r#"{"attempt":{"id":1,"state":"inprogress","timestart":1577836800,"timefinish":0,
            "timemodified":1577836800,"timemodifiedoffline":1577836800},"warnings":[]}"#;
        let attempt = decode::<StartAttemptWire>(body).unwrap();
        assert_eq!(attempt.state, "inprogress");
        assert_eq!(attempt.time_finish, None);
        assert_eq!(attempt.time_start, at(0, 0));
    }

    #[test]
    fn start_attempt_warning_fails_despite_empty_attempt() {
        let body = r#"{"attempt":{},"warnings":[{"item":"quiz","itemid":1111,"warningcode":"1","message":"This quiz is not currently available"}]}"#;
        let err = decode::<StartAttemptWire>(body).unwrap_err();
        assert!(err.to_string().contains("This quiz is not currently available"));
    }

    #[test]
    fn maps_attempt_review() {
        let body = format!(
            r#"{{
  "grade": "0.00",
  "attempt": {ATTEMPT},
  "additionaldata": [],
  "questions": [
    {{
      "slot": 1,
      "type": "multichoice",
      "page": 0,
      "html": "<div id=\"question-4494491-5\">question body</div>\n",
      "sequencecheck": 2,
      "lastactiontime": 1577836800,
      "hasautosavedstep": false,
      "flagged": false,
      "number": 5,
      "state": "gaveup",
      "status": "Not answered",
      "blockedbyprevious": false,
      "mark": "",
      "maxmark": 1
    }}
  ],
  "warnings": []
}}"#
        );
        let review = decode::<AttemptReviewWire>(&body).unwrap();
        assert_eq!(review.grade, Some(0.0));
        assert_eq!(review.attempt, finished_attempt());
        assert_eq!(
            review.questions,
            vec![QuizQuestion {
                slot: 1,
                kind: "multichoice".to_string(),
                page: 0,
                html_raw: "<div id=\"question-4494491-5\">question body</div>\n".to_string(),
                sequence_check: 2,
                last_action_time: at(0, 0),
                has_autosaved_step: false,
                flagged: false,
                number: Some(5),
                state: "gaveup".to_string(),
                status: "Not answered".to_string(),
                blocked_by_previous: false,
                mark: String::new(),
                max_mark: 1.0,
            }]
        );
    }

    #[test]
    fn process_attempt_warning_fails() {
        let body = r#"{"state":"inprogress","warnings":[{"item":"quiz","itemid":1111,"warningcode":"1","message":"Test message"}]}"#;
        let err = classify::<ProcessAttemptWire>(body.as_bytes())
            .unwrap()
            .into_result()
            .unwrap_err();
        assert!(matches!(err, Error::Warnings(_)));
    }

    #[test]
    fn already_closed_attempt_is_application_error() {
        let body = r#"{"exception":"moodle_quiz_exception","errorcode":"attemptalreadyclosed","message":"This attempt has already been finished."}"#;
        let err = decode::<StartAttemptWire>(body).unwrap_err();
        assert_eq!(err.code(), "attemptalreadyclosed");
    }
}
