use crate::config::Config;
use crate::error::AppError;
use crate::models::Visitor;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    // Ids end up inside lock ids and database keys
    static ref ID_PATTERN: Regex = Regex::new(r"^[A-Za-z0-9_-]{1,128}$").unwrap();
}

/// Interactive session parameters the platform appends to every request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Credentials {
    pub asset_id: Option<String>,
    pub display_name: Option<String>,
    pub identity_id: Option<String>,
    pub interactive_nonce: Option<String>,
    pub interactive_public_key: Option<String>,
    pub profile_id: Option<String>,
    pub scene_drop_id: Option<String>,
    pub unique_name: Option<String>,
    pub url_slug: Option<String>,
    pub username: Option<String>,
    pub visitor_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub asset_id: String,
    pub profile_id: String,
    pub url_slug: Option<String>,
    pub scene_drop_id: Option<String>,
}

impl Credentials {
    pub fn resolve(&self, interactive_key: Option<&str>) -> Result<Session, AppError> {
        if let Some(expected) = interactive_key {
            if self.interactive_public_key.as_deref() != Some(expected) {
                return Err(AppError::InvalidCredentials);
            }
        }

        let asset_id = required(&self.asset_id, "assetId")?;
        let profile_id = required(&self.profile_id, "profileId")?;

        Ok(Session {
            asset_id,
            profile_id,
            url_slug: present(&self.url_slug),
            scene_drop_id: present(&self.scene_drop_id),
        })
    }
}

impl Session {
    pub fn visitor(&self, config: &Config) -> Visitor {
        Visitor {
            is_admin: config.is_admin(&self.profile_id),
            profile_id: self.profile_id.clone(),
        }
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(value: &Option<String>, name: &'static str) -> Result<String, AppError> {
    let value = present(value).ok_or(AppError::MissingCredentials(name))?;
    if !ID_PATTERN.is_match(&value) {
        return Err(AppError::InvalidCredentials);
    }
    Ok(value)
}
