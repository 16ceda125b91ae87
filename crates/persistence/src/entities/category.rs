//! Category entities (database row mappings).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domain::models::{Category, CategoryId, CategoryRef};

/// Database row mapping for the categories table.
#[derive(Debug, Clone, FromRow)]
pub struct CategoryEntity {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<CategoryEntity> for Category {
    fn from(entity: CategoryEntity) -> Self {
        Self {
            id: CategoryId(entity.id),
            name: entity.name,
            slug: entity.slug,
            parent_id: entity.parent_id.map(CategoryId),
        }
    }
}

/// A category joined to one of its events.
#[derive(Debug, Clone, FromRow)]
pub struct EventCategoryEntity {
    pub event_id: i64,
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl From<EventCategoryEntity> for CategoryRef {
    fn from(entity: EventCategoryEntity) -> Self {
        Self {
            id: CategoryId(entity.id),
            name: entity.name,
            slug: entity.slug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_entity_conversion() {
        let category: Category = CategoryEntity {
            id: 2,
            name: "Workshops".to_string(),
            slug: "workshops".to_string(),
            parent_id: Some(1),
            created_at: Utc::now(),
        }
        .into();
        assert_eq!(category.id, CategoryId(2));
        assert_eq!(category.parent_id, Some(CategoryId(1)));
    }
}
