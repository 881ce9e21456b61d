use serde::{Deserialize, Serialize};

use shopfront_core::{CategoryId, DomainError, DomainResult, Entity};

/// Product grouping. Names are unique (case-sensitive); uniqueness is
/// checked by the store-backed service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// Create/update payload for a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl CategoryInput {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("category name is required"));
        }
        Ok(())
    }
}

impl Category {
    pub fn create(id: CategoryId, input: CategoryInput) -> DomainResult<Self> {
        input.validate()?;
        Ok(Self {
            id,
            name: input.name.trim().to_string(),
            description: input.description,
            image: input.image,
        })
    }

    pub fn update(&mut self, input: CategoryInput) -> DomainResult<()> {
        input.validate()?;
        self.name = input.name.trim().to_string();
        self.description = input.description;
        self.image = input.image;
        Ok(())
    }
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> Self::Id {
        self.id
    }
}
