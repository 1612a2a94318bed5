//! Equipment and magic item repository

use std::sync::Arc;

use serde_json::json;

use gm_knowledge_core::catalog::{Equipment, MagicItem};
use gm_knowledge_core::Result;

use super::Repository;
use crate::ContentStore;

pub struct EquipmentRepository {
    equipment: Repository<Equipment>,
    magic_items: Repository<MagicItem>,
}

impl EquipmentRepository {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self {
            equipment: Repository::new(Arc::clone(&store)),
            magic_items: Repository::new(store),
        }
    }

    /// The generic equipment repository
    pub fn base(&self) -> &Repository<Equipment> {
        &self.equipment
    }

    /// The generic magic item repository
    pub fn magic_items(&self) -> &Repository<MagicItem> {
        &self.magic_items
    }

    /// Weapons of a category ("Simple", "Martial")
    pub async fn get_by_weapon_category(&self, category: &str) -> Result<Vec<Equipment>> {
        self.equipment
            .filter_by(&[("weapon_category", json!(category))])
            .await
    }

    /// Armor of a category ("Light", "Medium", "Heavy", "Shield")
    pub async fn get_by_armor_category(&self, category: &str) -> Result<Vec<Equipment>> {
        self.equipment
            .filter_by(&[("armor_category", json!(category))])
            .await
    }

    /// Magic items of a rarity, matched case-insensitively
    pub async fn get_magic_items_by_rarity(&self, rarity: &str) -> Result<Vec<MagicItem>> {
        let items = self.magic_items.list_all().await?;
        Ok(items
            .into_iter()
            .filter(|item| {
                item.rarity_name()
                    .is_some_and(|name| name.eq_ignore_ascii_case(rarity))
            })
            .collect())
    }
}
