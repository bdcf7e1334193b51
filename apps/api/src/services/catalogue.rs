//! Category and attribute mutations.

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use aria_core::validation::{validate_hex_color, validate_name, validate_size_dimensions};
use aria_core::{Category, Color, CoreError, LogAction, ResourceType, Shape, Size, User, Variant};
use aria_db::Database;

use super::{clean, commit, log_entry, new_id, resolve_slug};
use crate::error::{ApiResult, ApplicationError};
use crate::selectors::found;

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub ordering: i64,
    #[serde(default)]
    pub display_in_navbar: bool,
    #[serde(default = "crate::services::default_true")]
    pub is_active: bool,
}

pub async fn category_create(
    db: &Database,
    actor: &User,
    input: CategoryInput,
) -> ApiResult<Category> {
    let now = Utc::now();
    let mut category = Category {
        id: new_id(),
        name: String::new(),
        slug: String::new(),
        description: None,
        parent_id: None,
        ordering: 0,
        display_in_navbar: false,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    apply_category(db, &mut category, input).await?;

    let mut tx = db.begin().await?;
    db.categories().insert(&mut *tx, &category).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::Category,
                &category.id,
                LogAction::Create,
                format!("Created category {}", category.name),
            ),
        )
        .await?;
    commit(tx).await?;

    info!(id = %category.id, slug = %category.slug, "Category created");
    Ok(category)
}

pub async fn category_update(
    db: &Database,
    actor: &User,
    id: &str,
    input: CategoryInput,
) -> ApiResult<Category> {
    let mut category = found(db.categories().get_by_id(id).await?, "Category", id)?;
    apply_category(db, &mut category, input).await?;
    category.updated_at = Utc::now();

    let mut tx = db.begin().await?;
    db.categories().update(&mut *tx, &category).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::Category,
                id,
                LogAction::Update,
                format!("Updated category {}", category.name),
            ),
        )
        .await?;
    commit(tx).await?;

    Ok(category)
}

/// Deletes a category; its children become top-level categories.
pub async fn category_delete(db: &Database, actor: &User, id: &str) -> ApiResult<()> {
    let category = found(db.categories().get_by_id(id).await?, "Category", id)?;

    let mut tx = db.begin().await?;
    db.categories().delete(&mut *tx, id).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::Category,
                id,
                LogAction::Delete,
                format!("Deleted category {}", category.name),
            ),
        )
        .await?;
    commit(tx).await?;

    info!(id, "Category deleted");
    Ok(())
}

async fn apply_category(
    db: &Database,
    category: &mut Category,
    input: CategoryInput,
) -> ApiResult<()> {
    let name = validate_name("name", &input.name)?;
    let parent_id = clean(input.parent_id);

    if let Some(parent_id) = &parent_id {
        let all = db.categories().list_all().await?;
        if !all.iter().any(|c| &c.id == parent_id) {
            return Err(ApplicationError::validation("Parent category does not exist")
                .with_field("parentId", "does not exist"));
        }
        if creates_cycle(&all, &category.id, parent_id) {
            return Err(
                CoreError::Conflict("A category cannot be placed below itself".to_string()).into(),
            );
        }
    }

    category.slug = resolve_slug(input.slug, &name)?;
    category.name = name;
    category.description = clean(input.description);
    category.parent_id = parent_id;
    category.ordering = input.ordering;
    category.display_in_navbar = input.display_in_navbar;
    category.is_active = input.is_active;
    Ok(())
}

/// Whether hanging `id` below `parent_id` would make it its own ancestor.
fn creates_cycle(all: &[Category], id: &str, parent_id: &str) -> bool {
    let mut current = Some(parent_id);
    let mut steps = 0;
    while let Some(candidate) = current {
        if candidate == id || steps > all.len() {
            return true;
        }
        current = all
            .iter()
            .find(|c| c.id == candidate)
            .and_then(|c| c.parent_id.as_deref());
        steps += 1;
    }
    false
}

// =============================================================================
// Attributes
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantInput {
    pub name: String,
    #[serde(default = "crate::services::default_true")]
    pub is_active: bool,
}

/// Dimensions in millimetres.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeInput {
    pub width: i64,
    pub height: i64,
    #[serde(default)]
    pub depth: Option<i64>,
    #[serde(default)]
    pub circumference: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorInput {
    pub name: String,
    pub color_hex: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeInput {
    pub name: String,
}

pub async fn variant_create(
    db: &Database,
    actor: &User,
    input: VariantInput,
) -> ApiResult<Variant> {
    let variant = Variant {
        id: new_id(),
        name: validate_name("name", &input.name)?,
        is_active: input.is_active,
    };

    let mut tx = db.begin().await?;
    db.attributes().insert_variant(&mut *tx, &variant).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::Variant,
                &variant.id,
                LogAction::Create,
                format!("Created variant {}", variant.name),
            ),
        )
        .await?;
    commit(tx).await?;

    Ok(variant)
}

pub async fn size_create(db: &Database, actor: &User, input: SizeInput) -> ApiResult<Size> {
    validate_size_dimensions(input.width, input.height, input.depth, input.circumference)?;
    let size = Size {
        id: new_id(),
        width: input.width,
        height: input.height,
        depth: input.depth,
        circumference: input.circumference,
    };

    let mut tx = db.begin().await?;
    db.attributes().insert_size(&mut *tx, &size).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::Size,
                &size.id,
                LogAction::Create,
                format!("Created size {}", size.name()),
            ),
        )
        .await?;
    commit(tx).await?;

    Ok(size)
}

pub async fn color_create(db: &Database, actor: &User, input: ColorInput) -> ApiResult<Color> {
    let color = Color {
        id: new_id(),
        name: validate_name("name", &input.name)?,
        color_hex: validate_hex_color(&input.color_hex)?,
    };

    let mut tx = db.begin().await?;
    db.attributes().insert_color(&mut *tx, &color).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::Color,
                &color.id,
                LogAction::Create,
                format!("Created color {}", color.name),
            ),
        )
        .await?;
    commit(tx).await?;

    Ok(color)
}

pub async fn shape_create(db: &Database, actor: &User, input: ShapeInput) -> ApiResult<Shape> {
    let shape = Shape {
        id: new_id(),
        name: validate_name("name", &input.name)?,
    };

    let mut tx = db.begin().await?;
    db.attributes().insert_shape(&mut *tx, &shape).await?;
    db.logs()
        .insert(
            &mut *tx,
            &log_entry(
                actor,
                ResourceType::Shape,
                &shape.id,
                LogAction::Create,
                format!("Created shape {}", shape.name),
            ),
        )
        .await?;
    commit(tx).await?;

    Ok(shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use axum::http::StatusCode;

    fn input(name: &str, parent_id: Option<&str>) -> CategoryInput {
        CategoryInput {
            name: name.to_string(),
            slug: None,
            description: None,
            parent_id: parent_id.map(str::to_string),
            ordering: 0,
            display_in_navbar: true,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_category_slug_and_parent_checks() {
        let db = test_support::db().await;
        let actor = test_support::superuser(&db).await;

        let root = category_create(&db, &actor, input("Gulv og Vegg", None)).await.unwrap();
        assert_eq!(root.slug, "gulv-og-vegg");
        let child = category_create(&db, &actor, input("Våtrom", Some(&root.id))).await.unwrap();
        assert_eq!(child.slug, "vatrom");

        let missing = category_create(&db, &actor, input("Ute", Some("nope"))).await.unwrap_err();
        assert_eq!(missing.status, StatusCode::BAD_REQUEST);

        let cycle = category_update(&db, &actor, &root.id, input("Gulv og Vegg", Some(&child.id)))
            .await
            .unwrap_err();
        assert_eq!(cycle.status, StatusCode::CONFLICT);

        let duplicate = category_create(&db, &actor, input("Våtrom", None)).await.unwrap_err();
        assert_eq!(duplicate.status, StatusCode::CONFLICT);

        category_delete(&db, &actor, &root.id).await.unwrap();
        let orphan = db.categories().get_by_id(&child.id).await.unwrap().unwrap();
        assert_eq!(orphan.parent_id, None);
    }

    #[test]
    fn test_creates_cycle() {
        let now = Utc::now();
        let make = |id: &str, parent: Option<&str>| Category {
            id: id.to_string(),
            name: id.to_string(),
            slug: id.to_string(),
            description: None,
            parent_id: parent.map(str::to_string),
            ordering: 0,
            display_in_navbar: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let all = vec![make("a", None), make("b", Some("a")), make("c", Some("b"))];

        assert!(creates_cycle(&all, "a", "c"));
        assert!(creates_cycle(&all, "a", "a"));
        assert!(!creates_cycle(&all, "c", "a"));
    }

    #[tokio::test]
    async fn test_attributes() {
        let db = test_support::db().await;
        let actor = test_support::superuser(&db).await;

        let gray = ColorInput {
            name: "Grå".to_string(),
            color_hex: "#8A8A8A".to_string(),
        };
        let color = color_create(&db, &actor, gray).await.unwrap();
        assert_eq!(color.color_hex, "#8a8a8a");

        let size = SizeInput { width: 300, height: 600, depth: None, circumference: None };
        size_create(&db, &actor, size.clone()).await.unwrap();
        let again = size_create(&db, &actor, size).await.unwrap_err();
        assert_eq!(again.status, StatusCode::CONFLICT);

        let zero = size_create(
            &db,
            &actor,
            SizeInput { width: 0, height: 600, depth: None, circumference: None },
        )
        .await
        .unwrap_err();
        assert_eq!(zero.status, StatusCode::BAD_REQUEST);

        let matt = VariantInput { name: "Matt".to_string(), is_active: true };
        variant_create(&db, &actor, matt).await.unwrap();
        shape_create(&db, &actor, ShapeInput { name: "Sekskant".to_string() }).await.unwrap();
        assert_eq!(db.attributes().count_variants().await.unwrap(), 1);
        assert_eq!(db.attributes().count_shapes().await.unwrap(), 1);
    }
}
