use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repo::Repository;

/// Permission levels form a total order: READ < WRITE < ADMIN. A granted
/// level satisfies a required level iff granted >= required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    Read,
    Write,
    Admin,
}

impl Permission {
    fn level(&self) -> u8 {
        match self {
            Permission::Read => 1,
            Permission::Write => 2,
            Permission::Admin => 3,
        }
    }

    pub fn is_sufficient(granted: Permission, required: Permission) -> bool {
        granted.level() >= required.level()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "READ",
            Permission::Write => "WRITE",
            Permission::Admin => "ADMIN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "READ" => Some(Permission::Read),
            "WRITE" => Some(Permission::Write),
            "ADMIN" => Some(Permission::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Document,
    Folder,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Document => "DOCUMENT",
            ResourceType::Folder => "FOLDER",
        }
    }
}

#[async_trait]
pub trait AccessControl: Send + Sync + 'static {
    async fn has_permission(
        &self,
        user_id: Uuid,
        resource_type: ResourceType,
        resource_id: Uuid,
        required: Permission,
    ) -> Result<bool>;
}

/// ACL evaluation over the acl_entries table: the strongest grant for the
/// (user, resource) pair is compared against the required level.
pub struct DbAccessControl {
    repo: Arc<dyn Repository>,
}

impl DbAccessControl {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl AccessControl for DbAccessControl {
    async fn has_permission(
        &self,
        user_id: Uuid,
        resource_type: ResourceType,
        resource_id: Uuid,
        required: Permission,
    ) -> Result<bool> {
        let granted = self
            .repo
            .max_granted_permission(user_id, resource_type.as_str(), resource_id)
            .await?;
        Ok(granted
            .map(|granted| Permission::is_sufficient(granted, required))
            .unwrap_or(false))
    }
}
