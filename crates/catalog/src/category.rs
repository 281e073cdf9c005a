use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{CategoryId, DomainError, DomainResult, Entity};

use crate::slugify;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewCategory {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
}

impl NewCategory {
    pub fn into_category(self, now: DateTime<Utc>) -> DomainResult<Category> {
        let name = non_empty_name(&self.name)?;
        let slug = resolve_slug(self.slug.as_deref(), &name)?;
        Ok(Category {
            id: CategoryId::new(),
            name,
            slug,
            description: self.description,
            parent_id: self.parent_id,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
}

impl CategoryPatch {
    pub fn apply(self, category: &mut Category, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = self.name {
            category.name = non_empty_name(&name)?;
        }
        if let Some(slug) = self.slug {
            category.slug = resolve_slug(Some(&slug), &category.name)?;
        }
        if let Some(description) = self.description {
            category.description = Some(description);
        }
        if let Some(parent_id) = self.parent_id {
            if parent_id == category.id {
                return Err(DomainError::validation("a category cannot be its own parent"));
            }
            category.parent_id = Some(parent_id);
        }
        category.updated_at = now;
        Ok(())
    }
}

pub(crate) fn non_empty_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name must not be empty"));
    }
    Ok(name.to_string())
}

/// Explicit slugs are normalized too, so `"Summer Sale"` and `"summer-sale"` collide.
pub(crate) fn resolve_slug(explicit: Option<&str>, name: &str) -> DomainResult<String> {
    let slug = slugify(explicit.unwrap_or(name));
    if slug.is_empty() {
        return Err(DomainError::validation("slug must contain letters or digits"));
    }
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_derived_from_name() {
        let c = NewCategory {
            name: "Summer Sale".into(),
            ..Default::default()
        }
        .into_category(Utc::now())
        .unwrap();
        assert_eq!(c.slug, "summer-sale");
    }

    #[test]
    fn explicit_slug_is_normalized() {
        let c = NewCategory {
            name: "Shoes".into(),
            slug: Some("Men Shoes".into()),
            ..Default::default()
        }
        .into_category(Utc::now())
        .unwrap();
        assert_eq!(c.slug, "men-shoes");
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = NewCategory::default().into_category(Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn self_parent_is_rejected() {
        let mut c = NewCategory {
            name: "Shoes".into(),
            ..Default::default()
        }
        .into_category(Utc::now())
        .unwrap();
        let patch = CategoryPatch {
            parent_id: Some(c.id),
            ..Default::default()
        };
        assert!(patch.apply(&mut c, Utc::now()).is_err());
    }
}
