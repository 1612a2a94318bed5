//! Monster repository with encounter-building filters

use std::sync::Arc;

use serde_json::json;

use gm_knowledge_core::catalog::Monster;
use gm_knowledge_core::Result;

use super::Repository;
use crate::ContentStore;

pub struct MonsterRepository {
    base: Repository<Monster>,
}

impl MonsterRepository {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self {
            base: Repository::new(store),
        }
    }

    /// The generic repository interface
    pub fn base(&self) -> &Repository<Monster> {
        &self.base
    }

    /// Monsters at an exact challenge rating
    pub async fn get_by_challenge_rating(&self, cr: f64) -> Result<Vec<Monster>> {
        self.base.filter_by(&[("challenge_rating", json!(cr))]).await
    }

    /// Monsters within an inclusive challenge-rating range
    pub async fn get_by_cr_range(&self, min: f64, max: f64) -> Result<Vec<Monster>> {
        let monsters = self.base.list_all().await?;
        Ok(monsters
            .into_iter()
            .filter(|m| m.challenge_rating >= min && m.challenge_rating <= max)
            .collect())
    }

    /// Monsters of a creature type (case-insensitive)
    pub async fn get_by_type(&self, creature_type: &str) -> Result<Vec<Monster>> {
        let monsters = self.base.list_all().await?;
        Ok(monsters
            .into_iter()
            .filter(|m| m.kind.eq_ignore_ascii_case(creature_type))
            .collect())
    }

    /// Monsters of a size category (case-insensitive)
    pub async fn get_by_size(&self, size: &str) -> Result<Vec<Monster>> {
        let monsters = self.base.list_all().await?;
        Ok(monsters
            .into_iter()
            .filter(|m| m.size.eq_ignore_ascii_case(size))
            .collect())
    }

    /// Monsters with legendary actions
    pub async fn get_legendary_monsters(&self) -> Result<Vec<Monster>> {
        let monsters = self.base.list_all().await?;
        Ok(monsters.into_iter().filter(Monster::is_legendary).collect())
    }
}
