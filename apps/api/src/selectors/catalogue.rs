//! Categories and product attributes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use aria_core::{Category, Color, Shape, Variant};
use aria_db::Database;

use super::found;
use super::products::SizeDetail;
use crate::error::ApiResult;

// =============================================================================
// Categories
// =============================================================================

/// A category with its sub-categories, recursively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTreeNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryTreeNode>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub parent: Option<Category>,
    pub children: Vec<Category>,
}

/// What the storefront needs to draw its menus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontCategories {
    pub tree: Vec<CategoryTreeNode>,
    pub navbar: Vec<Category>,
}

pub async fn category_list(
    db: &Database,
    search: Option<&str>,
    is_active: Option<bool>,
    limit: i64,
    offset: i64,
) -> ApiResult<(Vec<Category>, i64)> {
    let categories = db.categories();
    let rows = categories.list(search, is_active, limit, offset).await?;
    let count = categories.count(search, is_active).await?;
    Ok((rows, count))
}

pub async fn category_detail(db: &Database, id: &str) -> ApiResult<CategoryDetail> {
    let all = db.categories().list_all().await?;
    let category = found(all.iter().find(|c| c.id == id).cloned(), "Category", id)?;

    let parent = category
        .parent_id
        .as_ref()
        .and_then(|parent_id| all.iter().find(|c| &c.id == parent_id).cloned());
    let children = all
        .iter()
        .filter(|c| c.parent_id.as_deref() == Some(id))
        .cloned()
        .collect();

    Ok(CategoryDetail {
        category,
        parent,
        children,
    })
}

/// The category tree in sibling order.
///
/// With `active_only`, inactive categories are left out together with
/// everything below them.
pub async fn category_tree(db: &Database, active_only: bool) -> ApiResult<Vec<CategoryTreeNode>> {
    let all = db.categories().list_all().await?;
    Ok(build_tree(all, active_only))
}

pub async fn front_categories(db: &Database) -> ApiResult<FrontCategories> {
    Ok(FrontCategories {
        tree: category_tree(db, true).await?,
        navbar: db.categories().navbar().await?,
    })
}

fn build_tree(all: Vec<Category>, active_only: bool) -> Vec<CategoryTreeNode> {
    let mut by_parent: HashMap<Option<String>, Vec<Category>> = HashMap::new();
    for category in all {
        if active_only && !category.is_active {
            continue;
        }
        by_parent.entry(category.parent_id.clone()).or_default().push(category);
    }

    fn attach(
        parent_id: Option<String>,
        by_parent: &mut HashMap<Option<String>, Vec<Category>>,
    ) -> Vec<CategoryTreeNode> {
        let siblings = by_parent.remove(&parent_id).unwrap_or_default();
        siblings
            .into_iter()
            .map(|category| {
                let children = attach(Some(category.id.clone()), by_parent);
                CategoryTreeNode { category, children }
            })
            .collect()
    }

    attach(None, &mut by_parent)
}

// =============================================================================
// Attributes
// =============================================================================

pub async fn variant_list(
    db: &Database,
    limit: i64,
    offset: i64,
) -> ApiResult<(Vec<Variant>, i64)> {
    let attributes = db.attributes();
    Ok((
        attributes.list_variants(limit, offset).await?,
        attributes.count_variants().await?,
    ))
}

pub async fn size_list(
    db: &Database,
    limit: i64,
    offset: i64,
) -> ApiResult<(Vec<SizeDetail>, i64)> {
    let attributes = db.attributes();
    let sizes = attributes.list_sizes(limit, offset).await?;
    Ok((
        sizes.into_iter().map(SizeDetail::from).collect(),
        attributes.count_sizes().await?,
    ))
}

pub async fn color_list(db: &Database, limit: i64, offset: i64) -> ApiResult<(Vec<Color>, i64)> {
    let attributes = db.attributes();
    Ok((
        attributes.list_colors(limit, offset).await?,
        attributes.count_colors().await?,
    ))
}

pub async fn shape_list(db: &Database, limit: i64, offset: i64) -> ApiResult<(Vec<Shape>, i64)> {
    let attributes = db.attributes();
    Ok((
        attributes.list_shapes(limit, offset).await?,
        attributes.count_shapes().await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn category(id: &str, parent_id: Option<&str>, ordering: i64, is_active: bool) -> Category {
        Category {
            id: id.to_string(),
            name: id.to_string(),
            slug: id.to_string(),
            description: None,
            parent_id: parent_id.map(str::to_string),
            ordering,
            display_in_navbar: false,
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_build_tree_nests_in_order() {
        let tree = build_tree(
            vec![
                category("flis", None, 0, true),
                category("gulv", Some("flis"), 0, true),
                category("vegg", Some("flis"), 1, true),
                category("kjokken", None, 1, true),
            ],
            false,
        );

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].category.id, "flis");
        let children: Vec<&str> = tree[0].children.iter().map(|c| c.category.id.as_str()).collect();
        assert_eq!(children, vec!["gulv", "vegg"]);
        assert!(tree[1].children.is_empty());
    }

    #[test]
    fn test_build_tree_drops_inactive_branches() {
        let all = vec![
            category("flis", None, 0, false),
            category("gulv", Some("flis"), 0, true),
            category("kjokken", None, 1, true),
        ];

        let tree = build_tree(all.clone(), true);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].category.id, "kjokken");

        assert_eq!(build_tree(all, false)[0].children.len(), 1);
    }
}
