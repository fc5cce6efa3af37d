// src/services/catalog_service.rs

use sqlx::{Executor, Postgres};

use crate::{
    common::{
        error::AppError,
        pagination::{PageRequest, Paginated},
    },
    db::ItemRepository,
    models::item::{Item, ItemFilter, NewItem},
};

#[derive(Clone)]
pub struct CatalogService {
    item_repo: ItemRepository,
}

impl CatalogService {
    pub fn new(item_repo: ItemRepository) -> Self {
        Self { item_repo }
    }

    // --- CREATE ITEM ---
    // Saldo inicial é sempre zero: só o razão altera `current_stock`.
    pub async fn create_item<'e, E>(&self, executor: E, item: NewItem) -> Result<Item, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if item.minimum_stock_level > item.maximum_stock_level {
            return Err(AppError::InvalidInput(
                "minimum_stock_level cannot exceed maximum_stock_level".into(),
            ));
        }

        let created = self.item_repo.create_item(executor, &item).await?;
        tracing::info!(item_id = created.id, code = %created.code, "Item de catálogo criado");
        Ok(created)
    }

    pub async fn list_items(&self, filter: &ItemFilter, page: PageRequest) -> Result<Paginated<Item>, AppError> {
        let (data, total) = self.item_repo.list_items(filter, page).await?;
        Ok(Paginated {
            data,
            pagination: page.meta(total),
        })
    }

    pub async fn get_item(&self, item_id: i64) -> Result<Item, AppError> {
        self.item_repo
            .find_by_id(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item {}", item_id)))
    }
}
