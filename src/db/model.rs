//! Insert payloads used by repositories.
//!
//! Ids and timestamps are assigned by the repository, so these carry only
//! caller-supplied fields.

use crate::model::BrandGuide;

/// Fields for a new client profile.
#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub owner_id: String,
    pub name: String,
    pub company_name: String,
    pub job_title: String,
    pub linkedin: String,
    pub website: String,
    pub image: String,
    pub brand_guide: BrandGuide,
}

impl NewClient {
    pub fn new(owner_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Fields for a new post. The owner is copied from the client.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub client_id: String,
    pub content: String,
}
