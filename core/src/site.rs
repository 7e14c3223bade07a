//! Site and current-user information.

use serde::{Deserialize, Serialize};

use crate::classify::Envelope;
use crate::client::MoodleClient;
use crate::context::CallContext;
use crate::convert::{self, IntoDomain};
use crate::error::{Error, MappingError};
use crate::query::QueryParams;
use crate::transport::Transport;

pub const GET_SITE_INFO: &str = "core_webservice_get_site_info";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteInfo {
    pub site_name: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub lang: String,
    pub user_id: i64,
    pub site_url: String,
    pub user_picture_url: String,
    /// Service functions the token may call.
    pub functions: Vec<SiteFunctionVersion>,
    pub download_files: bool,
    pub upload_files: bool,
    pub release: String,
    pub version: String,
    pub mobile_css_url: String,
    pub advanced_features: Vec<AdvancedFeature>,
    pub user_can_manage_own_files: bool,
    pub user_quota: i64,
    pub user_max_upload_file_size: i64,
    pub user_home_page: i64,
    pub site_id: i64,
    pub site_calendar_type: String,
    pub user_calendar_type: String,
    pub theme: String,
}

impl SiteInfo {
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.iter().any(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteFunctionVersion {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvancedFeature {
    pub name: String,
    pub enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AdvancedFeatureWire {
    name: String,
    value: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SiteInfoWire {
    sitename: String,
    username: String,
    firstname: String,
    lastname: String,
    fullname: String,
    lang: String,
    userid: i64,
    siteurl: String,
    userpictureurl: String,
    functions: Vec<SiteFunctionVersion>,
    downloadfiles: i64,
    uploadfiles: i64,
    release: String,
    version: String,
    mobilecssurl: String,
    advancedfeatures: Vec<AdvancedFeatureWire>,
    usercanmanageownfiles: bool,
    userquota: i64,
    usermaxuploadfilesize: i64,
    userhomepage: i64,
    siteid: i64,
    sitecalendartype: String,
    usercalendartype: String,
    theme: String,
}

impl Envelope for SiteInfoWire {}

impl IntoDomain for SiteInfoWire {
    type Domain = SiteInfo;

    fn into_domain(self) -> Result<SiteInfo, MappingError> {
        Ok(SiteInfo {
            site_name: self.sitename,
            username: self.username,
            first_name: self.firstname,
            last_name: self.lastname,
            full_name: self.fullname,
            lang: self.lang,
            user_id: self.userid,
            site_url: self.siteurl,
            user_picture_url: self.userpictureurl,
            functions: self.functions,
            download_files: convert::bit(self.downloadfiles),
            upload_files: convert::bit(self.uploadfiles),
            release: self.release,
            version: self.version,
            mobile_css_url: self.mobilecssurl,
            advanced_features: self
                .advancedfeatures
                .into_iter()
                .map(|f| AdvancedFeature {
                    name: f.name,
                    enabled: convert::bit(f.value),
                })
                .collect(),
            user_can_manage_own_files: self.usercanmanageownfiles,
            user_quota: self.userquota,
            user_max_upload_file_size: self.usermaxuploadfilesize,
            user_home_page: self.userhomepage,
            site_id: self.siteid,
            site_calendar_type: self.sitecalendartype,
            user_calendar_type: self.usercalendartype,
            theme: self.theme,
        })
    }
}

impl<T: Transport> MoodleClient<T> {
    pub async fn site_info(&self, ctx: &CallContext) -> Result<SiteInfo, Error> {
        self.call_mapped::<SiteInfoWire>(ctx, GET_SITE_INFO, &QueryParams::new())
            .await
    }
}
