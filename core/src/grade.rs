//! User grade report: raw grade items and the rendered grades table.
//!
//! # Design
//! `gradereport_user_get_grade_items` returns plain data and maps field by
//! field. `gradereport_user_get_grades_table` returns the report as it is
//! drawn on screen: rows of HTML cells, with `tabledata` entries that are
//! either row objects or empty arrays used as spacers. Rows are decoded
//! into [`TableRow`] by field presence; a row object that does not decode
//! fails the mapping. A row without a grade cell labels the group of graded
//! rows after it. Graded rows whose course-total contribution is `-` are
//! aggregates and are left out, and a group left with no items is dropped,
//! so an empty table maps to no groups at all.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classify::Envelope;
use crate::client::MoodleClient;
use crate::context::CallContext;
use crate::convert::{self, IntoDomain};
use crate::error::{Error, MappingError};
use crate::query::QueryParams;
use crate::transport::Transport;
use crate::warning::Warnings;

pub const GET_GRADE_ITEMS: &str = "gradereport_user_get_grade_items";
pub const GET_GRADES_TABLE: &str = "gradereport_user_get_grades_table";

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?([0-9]*[.])?[0-9]+").expect("number pattern is valid"));

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("anchor selector is valid"));

/// One user's grade items in one course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserGrade {
    pub course_id: i64,
    pub user_id: i64,
    pub user_full_name: String,
    pub max_depth: i64,
    pub grade_items: Vec<GradeItem>,
}

/// A single grade. For an item's share of the course total see
/// [`GradeTableItem`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeItem {
    pub id: i64,
    pub item_name: String,
    pub item_type: String,
    pub item_module: Option<String>,
    pub item_instance: i64,
    pub item_number: Option<i64>,
    pub category_id: Option<i64>,
    pub outcome_id: Option<i64>,
    pub scale_id: Option<i64>,
    pub locked: Option<bool>,
    pub cm_id: Option<i64>,
    pub grade_raw: Option<f64>,
    pub grade_date_submitted: Option<DateTime<Utc>>,
    pub grade_date_graded: Option<DateTime<Utc>>,
    pub grade_hidden_by_date: bool,
    pub grade_needs_update: bool,
    pub grade_is_hidden: bool,
    pub grade_is_locked: Option<bool>,
    pub grade_is_overridden: Option<bool>,
    pub grade_formatted: String,
    pub grade_min: f64,
    pub grade_max: f64,
    pub range_formatted: String,
    pub feedback: String,
    pub feedback_format: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeTable {
    pub course_id: i64,
    pub user_id: i64,
    pub user_full_name: String,
    pub max_depth: i64,
    pub item_groups: Vec<GradeTableItemGroup>,
}

/// Graded rows under one category label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeTableItemGroup {
    pub name: String,
    pub items: Vec<GradeTableItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeTableItem {
    pub item_name: String,
    pub item_name_raw_html: String,
    pub item_url: Option<String>,
    pub is_graded: bool,
    pub grade: f64,
    pub grade_range_min: f64,
    pub grade_range_max: f64,
    pub feedback: String,
    pub feedback_raw_html: String,
    /// Percentage of the course total this item contributes.
    pub contribution_to_course_total: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct GradeItemWire {
    id: i64,
    itemname: Option<String>,
    itemtype: String,
    itemmodule: Option<String>,
    iteminstance: i64,
    itemnumber: Option<i64>,
    categoryid: Option<i64>,
    outcomeid: Option<i64>,
    scaleid: Option<i64>,
    locked: Option<bool>,
    cmid: Option<i64>,
    graderaw: Option<f64>,
    gradedatesubmitted: Option<i64>,
    gradedategraded: Option<i64>,
    gradehiddenbydate: bool,
    gradeneedsupdate: bool,
    gradeishidden: bool,
    gradeislocked: Option<bool>,
    gradeisoverridden: Option<bool>,
    gradeformatted: String,
    grademin: f64,
    grademax: f64,
    rangeformatted: String,
    feedback: String,
    feedbackformat: i64,
}

impl IntoDomain for GradeItemWire {
    type Domain = GradeItem;

    fn into_domain(self) -> Result<GradeItem, MappingError> {
        Ok(GradeItem {
            id: self.id,
            item_name: self.itemname.unwrap_or_default(),
            item_type: self.itemtype,
            item_module: self.itemmodule,
            item_instance: self.iteminstance,
            item_number: self.itemnumber,
            category_id: self.categoryid,
            outcome_id: self.outcomeid,
            scale_id: self.scaleid,
            locked: self.locked,
            cm_id: self.cmid,
            grade_raw: self.graderaw,
            grade_date_submitted: convert::optional_epoch(self.gradedatesubmitted)?,
            grade_date_graded: convert::optional_epoch(self.gradedategraded)?,
            grade_hidden_by_date: self.gradehiddenbydate,
            grade_needs_update: self.gradeneedsupdate,
            grade_is_hidden: self.gradeishidden,
            grade_is_locked: self.gradeislocked,
            grade_is_overridden: self.gradeisoverridden,
            grade_formatted: self.gradeformatted,
            grade_min: self.grademin,
            grade_max: self.grademax,
            range_formatted: self.rangeformatted,
            feedback: self.feedback,
            feedback_format: self.feedbackformat,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct UserGradeWire {
    courseid: i64,
    userid: i64,
    userfullname: String,
    maxdepth: i64,
    gradeitems: Vec<GradeItemWire>,
}

impl IntoDomain for UserGradeWire {
    type Domain = UserGrade;

    fn into_domain(self) -> Result<UserGrade, MappingError> {
        Ok(UserGrade {
            course_id: self.courseid,
            user_id: self.userid,
            user_full_name: self.userfullname,
            max_depth: self.maxdepth,
            grade_items: self.gradeitems.into_domain()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct GradeItemsWire {
    usergrades: Vec<UserGradeWire>,
    warnings: Warnings,
}

impl Envelope for GradeItemsWire {
    fn warnings(&self) -> Option<&Warnings> {
        Some(&self.warnings)
    }
}

impl IntoDomain for GradeItemsWire {
    type Domain = Vec<UserGrade>;

    fn into_domain(self) -> Result<Vec<UserGrade>, MappingError> {
        self.usergrades.into_domain()
    }
}

/// One rendered table cell. Only the content matters for mapping.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub(crate) struct Cell {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RowWire {
    itemname: Option<Cell>,
    grade: Option<Cell>,
    range: Option<Cell>,
    feedback: Option<Cell>,
    contributiontocoursetotal: Option<Cell>,
}

/// A grades-table row, told apart by whether it has a grade cell.
#[derive(Debug)]
pub(crate) enum TableRow {
    Label { name: Cell },
    Graded(GradedRow),
}

#[derive(Debug)]
pub(crate) struct GradedRow {
    itemname: Cell,
    grade: Cell,
    range: Option<Cell>,
    feedback: Option<Cell>,
    contribution: Option<Cell>,
}

impl TableRow {
    /// `None` for the empty-array spacers the service puts between rows.
    fn from_value(value: Value) -> Result<Option<TableRow>, serde_json::Error> {
        if !value.is_object() {
            return Ok(None);
        }
        let row: RowWire = serde_json::from_value(value)?;
        let itemname = row.itemname.unwrap_or_default();
        Ok(Some(match row.grade {
            None => TableRow::Label { name: itemname },
            Some(grade) => TableRow::Graded(GradedRow {
                itemname,
                grade,
                range: row.range,
                feedback: row.feedback,
                contribution: row.contributiontocoursetotal,
            }),
        }))
    }
}

impl GradedRow {
    /// Aggregate rows (course and category totals) have no contribution.
    fn is_aggregate(&self) -> bool {
        self.contribution
            .as_ref()
            .map_or(true, |cell| cell.content == "-")
    }
}

impl IntoDomain for GradedRow {
    type Domain = GradeTableItem;

    fn into_domain(self) -> Result<GradeTableItem, MappingError> {
        let name_html = Html::parse_fragment(&self.itemname.content);
        let item_url = name_html
            .select(&ANCHOR)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string);

        let is_graded = self.grade.content != "-";
        let grade = if is_graded {
            first_number("grade", &self.grade.content)?
        } else {
            0.0
        };

        // "0&ndash;100"
        let range = self.range.ok_or(MappingError::MissingCell("range"))?;
        let (grade_range_min, grade_range_max) = number_pair("range", &range.content)?;

        let feedback_raw = self.feedback.map(|c| c.content).unwrap_or_default();

        // "2.70 %"
        let contribution = self
            .contribution
            .ok_or(MappingError::MissingCell("contributiontocoursetotal"))?;
        let contribution_to_course_total = first_number("contributiontocoursetotal", &contribution.content)?;

        Ok(GradeTableItem {
            item_name: fragment_text(&name_html),
            item_name_raw_html: self.itemname.content,
            item_url,
            is_graded,
            grade,
            grade_range_min,
            grade_range_max,
            feedback: html_text(&feedback_raw),
            feedback_raw_html: feedback_raw,
            contribution_to_course_total,
        })
    }
}

/// Group graded rows under the label row that precedes them.
fn group_rows(rows: Vec<TableRow>) -> Result<Vec<GradeTableItemGroup>, MappingError> {
    let mut groups = Vec::new();
    let mut name = String::new();
    let mut items = Vec::new();

    for row in rows {
        match row {
            TableRow::Label { name: cell } => {
                if !items.is_empty() {
                    groups.push(GradeTableItemGroup {
                        name: std::mem::take(&mut name),
                        items: std::mem::take(&mut items),
                    });
                }
                name = html_text(&cell.content);
            }
            TableRow::Graded(row) if row.is_aggregate() => {}
            TableRow::Graded(row) => items.push(row.into_domain()?),
        }
    }
    if !items.is_empty() {
        groups.push(GradeTableItemGroup { name, items });
    }
    Ok(groups)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct TableWire {
    courseid: i64,
    userid: i64,
    userfullname: String,
    maxdepth: i64,
    tabledata: Vec<Value>,
}

impl IntoDomain for TableWire {
    type Domain = GradeTable;

    fn into_domain(self) -> Result<GradeTable, MappingError> {
        let mut rows = Vec::with_capacity(self.tabledata.len());
        for (index, value) in self.tabledata.into_iter().enumerate() {
            let row = TableRow::from_value(value).map_err(|e| MappingError::MalformedRow {
                index,
                reason: e.to_string(),
            })?;
            rows.extend(row);
        }
        Ok(GradeTable {
            course_id: self.courseid,
            user_id: self.userid,
            user_full_name: self.userfullname,
            max_depth: self.maxdepth,
            item_groups: group_rows(rows)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct GradesTableWire {
    tables: Vec<TableWire>,
    warnings: Warnings,
}

impl Envelope for GradesTableWire {
    fn warnings(&self) -> Option<&Warnings> {
        Some(&self.warnings)
    }
}

impl IntoDomain for GradesTableWire {
    type Domain = Vec<GradeTable>;

    fn into_domain(self) -> Result<Vec<GradeTable>, MappingError> {
        self.tables.into_domain()
    }
}

fn html_text(html: &str) -> String {
    fragment_text(&Html::parse_fragment(html))
}

fn fragment_text(fragment: &Html) -> String {
    fragment.root_element().text().collect()
}

fn first_number(field: &'static str, content: &str) -> Result<f64, MappingError> {
    let token = NUMBER_RE
        .find(content)
        .ok_or_else(|| MappingError::MissingNumber {
            field,
            content: content.to_string(),
        })?;
    parse_number(field, token.as_str())
}

fn number_pair(field: &'static str, content: &str) -> Result<(f64, f64), MappingError> {
    let mut tokens = NUMBER_RE.find_iter(content);
    let missing = || MappingError::MissingNumber {
        field,
        content: content.to_string(),
    };
    let min = tokens.next().ok_or_else(missing)?;
    let max = tokens.next().ok_or_else(missing)?;
    Ok((parse_number(field, min.as_str())?, parse_number(field, max.as_str())?))
}

fn parse_number(field: &'static str, token: &str) -> Result<f64, MappingError> {
    token.parse().map_err(|_| MappingError::InvalidNumber {
        field,
        token: token.to_string(),
    })
}

impl<T: Transport> MoodleClient<T> {
    pub async fn grade_items(
        &self,
        ctx: &CallContext,
        user_id: i64,
        course_id: i64,
    ) -> Result<Vec<UserGrade>, Error> {
        let params = QueryParams::new()
            .with("userid", user_id)
            .with("courseid", course_id);
        self.call_mapped::<GradeItemsWire>(ctx, GET_GRADE_ITEMS, &params)
            .await
    }

    pub async fn grades_table(
        &self,
        ctx: &CallContext,
        user_id: i64,
        course_id: i64,
    ) -> Result<Vec<GradeTable>, Error> {
        let params = QueryParams::new()
            .with("userid", user_id)
            .with("courseid", course_id);
        self.call_mapped::<GradesTableWire>(ctx, GET_GRADES_TABLE, &params)
            .await
    }
}
