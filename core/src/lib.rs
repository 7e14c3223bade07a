//! Typed async client for the Moodle web service REST gateway.
//!
//! # Overview
//! Every service function is reached through one URL,
//! `/webservice/rest/server.php`, selected by the `wsfunction` query
//! parameter and authorized by `wstoken`. Responses come back as JSON in
//! one of three shapes (success, error envelope, success with warnings)
//! without a discriminator, so each response is classified before it is
//! decoded.
//!
//! # Design
//! - Request construction and response parsing are plain functions over
//!   [`HttpRequest`] and [`HttpResponse`]; a [`Transport`] does the actual
//!   round-trip. [`ReqwestTransport`] is the default.
//! - [`MoodleClient`] holds the transport and the current
//!   [`ServiceEndpoint`], and is shared between tasks by reference.
//! - Every call takes a [`CallContext`] for cancellation and deadlines.
//! - Wire structs mirror the JSON; [`convert::IntoDomain`] maps them into
//!   the public types with shared field rules.
//!
//! ```no_run
//! # async fn run() -> Result<(), moodle_core::Error> {
//! use moodle_core::{CallContext, ClientConfig, CourseClassification, MoodleClient};
//!
//! let config = ClientConfig::new("https://school.example".parse()?);
//! let ctx = CallContext::background();
//! let client = MoodleClient::connect_with_login(config, &ctx, "student", "secret").await?;
//! let courses = client
//!     .enrolled_courses_by_timeline_classification(&ctx, CourseClassification::InProgress)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod classify;
pub mod client;
pub mod config;
pub mod context;
pub mod convert;
pub mod course;
pub mod endpoint;
pub mod error;
pub mod grade;
pub mod http;
pub mod query;
pub mod quiz;
pub mod site;
pub mod transport;
pub mod user;
pub mod warning;

pub use auth::LoginResponse;
pub use classify::{Classified, Envelope};
pub use client::MoodleClient;
pub use config::{ClientConfig, ConfigError};
pub use context::CallContext;
pub use course::{Course, CourseClassification};
pub use endpoint::ServiceEndpoint;
pub use error::{ApplicationError, Error, MappingError};
pub use grade::{GradeItem, GradeTable, GradeTableItem, GradeTableItemGroup, UserGrade};
pub use http::{HttpRequest, HttpResponse};
pub use query::QueryParams;
pub use quiz::{AttemptReview, Quiz, QuizAttempt, QuizQuestion};
pub use site::{AdvancedFeature, SiteFunctionVersion, SiteInfo};
pub use transport::{ReqwestTransport, Transport, TransportError};
pub use user::{CreatedUser, CustomField, NewUser};
pub use warning::{Warning, Warnings};
