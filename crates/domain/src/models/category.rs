//! Category domain model.

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Store-assigned category identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub i64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A category events can be filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<CategoryId>,
}

/// Category reference embedded in an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
}

impl From<&Category> for CategoryRef {
    fn from(c: &Category) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            slug: c.slug.clone(),
        }
    }
}

/// Request payload for creating a category.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 100, message = "Slug must be 1-100 characters"))]
    #[validate(custom(function = "shared::validation::validate_slug"))]
    pub slug: String,

    pub parent_id: Option<CategoryId>,
}

/// Validated input for inserting a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub parent_id: Option<CategoryId>,
}

impl From<CreateCategoryRequest> for NewCategory {
    fn from(req: CreateCategoryRequest) -> Self {
        Self {
            name: req.name.trim().to_string(),
            slug: req.slug,
            parent_id: req.parent_id,
        }
    }
}
