//! Enrolled course listing.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::Envelope;
use crate::client::MoodleClient;
use crate::context::CallContext;
use crate::convert::{self, IntoDomain};
use crate::error::{Error, MappingError};
use crate::query::QueryParams;
use crate::transport::Transport;

pub const GET_ENROLLED_COURSES_BY_TIMELINE_CLASSIFICATION: &str =
    "core_course_get_enrolled_courses_by_timeline_classification";

/// Which part of the timeline a course falls in for the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseClassification {
    Past,
    InProgress,
    Future,
}

impl CourseClassification {
    pub fn as_str(self) -> &'static str {
        match self {
            CourseClassification::Past => "past",
            CourseClassification::InProgress => "inprogress",
            CourseClassification::Future => "future",
        }
    }
}

impl fmt::Display for CourseClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Course {
    pub id: i64,
    pub full_name: String,
    pub short_name: String,
    pub id_number: String,
    pub summary: String,
    pub summary_format: i64,
    pub start_date: DateTime<Utc>,
    /// `None` when the course has no end date.
    pub end_date: Option<DateTime<Utc>>,
    pub visible: bool,
    pub full_name_display: String,
    pub view_url: String,
    pub course_image: String,
    pub progress: Option<i64>,
    pub has_progress: bool,
    pub is_favourite: bool,
    pub hidden: bool,
    pub show_short_name: bool,
    pub course_category: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CourseWire {
    id: i64,
    fullname: String,
    shortname: String,
    idnumber: String,
    summary: String,
    summaryformat: i64,
    startdate: i64,
    enddate: i64,
    visible: bool,
    fullnamedisplay: String,
    viewurl: String,
    courseimage: String,
    progress: Option<i64>,
    hasprogress: bool,
    isfavourite: bool,
    hidden: bool,
    showshortname: bool,
    coursecategory: String,
}

impl IntoDomain for CourseWire {
    type Domain = Course;

    fn into_domain(self) -> Result<Course, MappingError> {
        Ok(Course {
            id: self.id,
            full_name: self.fullname,
            short_name: self.shortname,
            id_number: self.idnumber,
            summary: self.summary,
            summary_format: self.summaryformat,
            start_date: convert::epoch(self.startdate)?,
            end_date: convert::optional_epoch(Some(self.enddate))?,
            visible: self.visible,
            full_name_display: self.fullnamedisplay,
            view_url: self.viewurl,
            course_image: self.courseimage,
            progress: self.progress,
            has_progress: self.hasprogress,
            is_favourite: self.isfavourite,
            hidden: self.hidden,
            show_short_name: self.showshortname,
            course_category: self.coursecategory,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct EnrolledCoursesWire {
    courses: Vec<CourseWire>,
    #[allow(dead_code)]
    nextoffset: i64,
}

impl Envelope for EnrolledCoursesWire {}

impl IntoDomain for EnrolledCoursesWire {
    type Domain = Vec<Course>;

    fn into_domain(self) -> Result<Vec<Course>, MappingError> {
        self.courses.into_domain()
    }
}

impl<T: Transport> MoodleClient<T> {
    /// Courses the current user is enrolled in, filtered by timeline position.
    pub async fn enrolled_courses_by_timeline_classification(
        &self,
        ctx: &CallContext,
        classification: CourseClassification,
    ) -> Result<Vec<Course>, Error> {
        let params = QueryParams::new().with("classification", classification);
        self.call_mapped::<EnrolledCoursesWire>(
            ctx,
            GET_ENROLLED_COURSES_BY_TIMELINE_CLASSIFICATION,
            &params,
        )
        .await
    }
}
