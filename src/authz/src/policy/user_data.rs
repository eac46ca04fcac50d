//! Extra data exposed to policy programs as `data.user_data`

use async_trait::async_trait;
use serde_json::Value;
use warden_core::{RoleClaim, Subject};

use crate::error::Result;

#[async_trait]
pub trait UserDataProvider: Send + Sync {
    async fn collect(&self, subject: &Subject, claim: &RoleClaim) -> Result<Value>;
}

/// Provider returning an empty object
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyUserData;

#[async_trait]
impl UserDataProvider for EmptyUserData {
    async fn collect(&self, _subject: &Subject, _claim: &RoleClaim) -> Result<Value> {
        Ok(Value::Object(Default::default()))
    }
}
