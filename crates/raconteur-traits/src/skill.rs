//! Skill model types and the provider trait implemented by the host
//! application's skill storage.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillInfo {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillContent {
    pub id: String,
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillRecord {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SkillUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub tags: Option<Option<Vec<String>>>,
    pub content: Option<String>,
}

/// Accessor for skills, implemented by the host application.
pub trait SkillProvider: Send + Sync {
    fn list_skills(&self) -> Vec<SkillInfo>;
    fn get_skill(&self, id: &str) -> Option<SkillContent>;
    fn create_skill(&self, skill: SkillRecord) -> std::result::Result<SkillRecord, String>;
    fn update_skill(&self, id: &str, update: SkillUpdate) -> std::result::Result<SkillRecord, String>;
    fn delete_skill(&self, id: &str) -> std::result::Result<bool, String>;
    fn export_skill(&self, id: &str) -> std::result::Result<String, String>;
    fn import_skill(
        &self,
        id: &str,
        markdown: &str,
        overwrite: bool,
    ) -> std::result::Result<SkillRecord, String>;
}
