//! Spell repository with casting-oriented filters

use std::sync::Arc;

use serde_json::json;

use gm_knowledge_core::catalog::Spell;
use gm_knowledge_core::Result;

use super::Repository;
use crate::ContentStore;

pub struct SpellRepository {
    base: Repository<Spell>,
}

impl SpellRepository {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self {
            base: Repository::new(store),
        }
    }

    /// The generic repository interface
    pub fn base(&self) -> &Repository<Spell> {
        &self.base
    }

    /// Spells of an exact level (0 = cantrips)
    pub async fn get_by_level(&self, level: i64) -> Result<Vec<Spell>> {
        self.base.filter_by(&[("level", json!(level))]).await
    }

    /// Spells of a school, matched by school name case-insensitively
    pub async fn get_by_school(&self, school: &str) -> Result<Vec<Spell>> {
        let spells = self.base.list_all().await?;
        Ok(spells
            .into_iter()
            .filter(|s| {
                s.school
                    .as_ref()
                    .is_some_and(|school_ref| school_ref.name.eq_ignore_ascii_case(school))
            })
            .collect())
    }

    /// Spells castable by a class, by class index
    pub async fn get_by_class(&self, class_index: &str) -> Result<Vec<Spell>> {
        let spells = self.base.list_all().await?;
        Ok(spells
            .into_iter()
            .filter(|s| s.castable_by(class_index))
            .collect())
    }

    /// Spells castable by a class at an exact level
    pub async fn get_by_class_and_level(
        &self,
        class_index: &str,
        level: i64,
    ) -> Result<Vec<Spell>> {
        let spells = self.get_by_level(level).await?;
        Ok(spells
            .into_iter()
            .filter(|s| s.castable_by(class_index))
            .collect())
    }

    /// Spells that can be cast as rituals
    pub async fn get_ritual_spells(&self) -> Result<Vec<Spell>> {
        self.base.filter_by(&[("ritual", json!(true))]).await
    }

    /// Spells requiring concentration
    pub async fn get_concentration_spells(&self) -> Result<Vec<Spell>> {
        self.base.filter_by(&[("concentration", json!(true))]).await
    }
}
