//! Skill system - types re-exported from raconteur-ai, implementations here.

pub mod loader;
pub mod tool;

// Re-export skill types from raconteur-ai
pub use raconteur_traits::skill::{
    SkillContent, SkillInfo, SkillProvider, SkillRecord, SkillUpdate,
};
