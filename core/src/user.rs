//! User account creation.
//!
//! `core_user_create_users` takes a list of records. Each record is sent as
//! indexed query keys, `users[0][username]=..&users[0][email]=..`, and
//! optional fields are omitted rather than sent empty.

use serde::{Deserialize, Serialize};

use crate::client::MoodleClient;
use crate::context::CallContext;
use crate::convert::IntoDomain;
use crate::error::{Error, MappingError};
use crate::query::{self, QueryParams};
use crate::transport::Transport;

pub const CREATE_USERS: &str = "core_user_create_users";

/// Profile field values keyed by the field's short name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomField {
    pub kind: String,
    pub value: String,
}

/// A user account to create.
///
/// Either set `password` or `create_password`; with the latter the site
/// generates one and emails it to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: Option<String>,
    pub create_password: bool,
    /// Authentication plugin, `manual` when unset.
    pub auth: Option<String>,
    pub id_number: Option<String>,
    pub lang: Option<String>,
    pub timezone: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub description: Option<String>,
    pub institution: Option<String>,
    pub department: Option<String>,
    pub mail_display: Option<i64>,
    pub custom_fields: Vec<CustomField>,
}

impl NewUser {
    pub fn new(
        username: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self.create_password = false;
        self
    }

    pub fn with_generated_password(mut self) -> Self {
        self.password = None;
        self.create_password = true;
        self
    }

    fn write_params(&self, index: usize, params: &mut QueryParams) {
        let mut put = |field: &str, value: &dyn std::fmt::Display| {
            params.insert(format!("users[{index}][{field}]"), value);
        };

        put("username", &self.username);
        put("firstname", &self.first_name);
        put("lastname", &self.last_name);
        put("email", &self.email);
        if let Some(password) = &self.password {
            put("password", password);
        }
        if self.create_password {
            put("createpassword", &query::bit(true));
        }

        let optional = [
            ("auth", &self.auth),
            ("idnumber", &self.id_number),
            ("lang", &self.lang),
            ("timezone", &self.timezone),
            ("city", &self.city),
            ("country", &self.country),
            ("description", &self.description),
            ("institution", &self.institution),
            ("department", &self.department),
        ];
        for (field, value) in optional {
            if let Some(value) = value {
                put(field, value);
            }
        }
        if let Some(mail_display) = self.mail_display {
            put("maildisplay", &mail_display);
        }

        for (j, field) in self.custom_fields.iter().enumerate() {
            put(&format!("customfields][{j}][type"), &field.kind);
            put(&format!("customfields][{j}][value"), &field.value);
        }
    }
}

/// Encode `users` as the indexed parameter set the service expects.
pub fn user_params(users: &[NewUser]) -> QueryParams {
    let mut params = QueryParams::new();
    for (i, user) in users.iter().enumerate() {
        user.write_params(i, &mut params);
    }
    params
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedUser {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CreatedUserWire {
    id: i64,
    username: String,
}

impl IntoDomain for CreatedUserWire {
    type Domain = CreatedUser;

    fn into_domain(self) -> Result<CreatedUser, MappingError> {
        Ok(CreatedUser {
            id: self.id,
            username: self.username,
        })
    }
}

impl<T: Transport> MoodleClient<T> {
    /// Create accounts, returning the new ids in request order.
    pub async fn create_users(
        &self,
        ctx: &CallContext,
        users: &[NewUser],
    ) -> Result<Vec<CreatedUser>, Error> {
        self.call_mapped::<Vec<CreatedUserWire>>(ctx, CREATE_USERS, &user_params(users))
            .await
    }
}
