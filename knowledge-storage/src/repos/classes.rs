//! Class repository

use std::sync::Arc;

use serde_json::json;

use gm_knowledge_core::catalog::CharacterClass;
use gm_knowledge_core::Result;

use super::Repository;
use crate::ContentStore;

pub struct ClassRepository {
    base: Repository<CharacterClass>,
}

impl ClassRepository {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self {
            base: Repository::new(store),
        }
    }

    /// The generic repository interface
    pub fn base(&self) -> &Repository<CharacterClass> {
        &self.base
    }

    /// Classes with an exact hit die
    pub async fn get_by_hit_die(&self, hit_die: i64) -> Result<Vec<CharacterClass>> {
        self.base.filter_by(&[("hit_die", json!(hit_die))]).await
    }

    /// Classes with any spellcasting progression
    pub async fn get_spellcasters(&self) -> Result<Vec<CharacterClass>> {
        let classes = self.base.list_all().await?;
        Ok(classes
            .into_iter()
            .filter(CharacterClass::is_spellcaster)
            .collect())
    }
}
