//! # Seed Data Generator
//!
//! Populates the database with a small tile catalogue for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./aria_dev.db with 3 options per product (default)
//! cargo run -p aria-db --bin seed
//!
//! # Specify database path and the admin password
//! cargo run -p aria-db --bin seed -- --db ./data/aria.db --password hemmelig123
//! ```
//!
//! ## Generated Data
//! - One superuser `admin@aria.local`
//! - Two suppliers, a small category tree, colors and shapes
//! - Products from [`PRODUCTS`], each with options for the sizes in [`SIZES`]
//! - One active percentage discount on the first product

use anyhow::Context;
use chrono::{Duration, Utc};
use std::env;
use tracing::{info, warn};
use uuid::Uuid;

use aria_core::password::hash_password;
use aria_core::slug::slugify;
use aria_core::{
    Category, Color, Discount, Product, ProductOption, ProductStatus, ProductUnit, Shape, Size,
    Supplier, User,
};
use aria_db::{Database, DbConfig};

/// (name, supplier index, category slug, base price per m² in cents)
const PRODUCTS: &[(&str, usize, &str, i64)] = &[
    ("Hvit Blank Flis", 0, "veggflis", 39_900),
    ("Terrazzo Grå", 0, "gulvflis", 89_900),
    ("Marmor Carrara", 1, "gulvflis", 129_900),
    ("Zellige Grønn", 1, "veggflis", 149_900),
    ("Sekskant Sort", 0, "gulvflis", 69_900),
];

/// (width, height) in millimetres and the price addon in cents
const SIZES: &[(i64, i64, i64)] = &[(300, 600, 0), (600, 600, 10_000), (600, 1200, 25_000)];

const COLORS: &[(&str, &str)] = &[
    ("Hvit", "#ffffff"),
    ("Grå", "#8a8a8a"),
    ("Sort", "#111111"),
    ("Grønn", "#3f6b4a"),
];

const SHAPES: &[&str] = &["Rektangel", "Kvadrat", "Sekskant"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,aria_db=debug".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./aria_dev.db");
    let mut password = String::from("admin12345");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--password" | "-p" => {
                if i + 1 < args.len() {
                    password = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Aria Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (default: ./aria_dev.db)");
                println!(
                    "  -p, --password <PW>    Password for admin@aria.local (default: admin12345)"
                );
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(db = %db_path, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;

    let existing = db.products().total().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        return Ok(());
    }

    let now = Utc::now();

    // Admin
    let admin = User {
        id: Uuid::new_v4().to_string(),
        email: "admin@aria.local".to_string(),
        first_name: "Aria".to_string(),
        last_name: "Admin".to_string(),
        phone: None,
        password_hash: hash_password(&password)?,
        is_active: true,
        is_staff: true,
        is_superuser: true,
        last_login: None,
        created_at: now,
        updated_at: now,
    };
    db.users().insert(db.pool(), &admin).await?;
    info!(email = %admin.email, "Created superuser");

    // Suppliers
    let suppliers: Vec<Supplier> = [("Marazzi", "Italia"), ("Equipe", "Spania")]
        .iter()
        .map(|(name, country)| Supplier {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            contact_first_name: None,
            contact_last_name: None,
            email: None,
            phone: None,
            origin_country: Some(country.to_string()),
            website: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .collect();
    for supplier in &suppliers {
        db.suppliers().insert(db.pool(), supplier).await?;
    }

    // Categories: Flis > {Gulvflis, Veggflis}
    let root = category("Flis", None, 0, now);
    db.categories().insert(db.pool(), &root).await?;
    let mut categories = Vec::new();
    for (ordering, name) in ["Gulvflis", "Veggflis"].iter().enumerate() {
        let child = category(name, Some(&root.id), ordering as i64, now);
        db.categories().insert(db.pool(), &child).await?;
        categories.push(child);
    }

    // Attributes
    let attributes = db.attributes();
    let mut colors = Vec::new();
    for (name, hex) in COLORS {
        let color = Color {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            color_hex: hex.to_string(),
        };
        attributes.insert_color(db.pool(), &color).await?;
        colors.push(color);
    }
    let mut shapes = Vec::new();
    for name in SHAPES {
        let shape = Shape {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
        };
        attributes.insert_shape(db.pool(), &shape).await?;
        shapes.push(shape);
    }
    let mut sizes = Vec::new();
    for (width, height, addon) in SIZES {
        let size = Size {
            id: Uuid::new_v4().to_string(),
            width: *width,
            height: *height,
            depth: Some(10),
            circumference: None,
        };
        attributes.insert_size(db.pool(), &size).await?;
        sizes.push((size, *addon));
    }

    // Products and options
    let mut first_product_id = None;
    for (index, (name, supplier_index, category_slug, base_price)) in PRODUCTS.iter().enumerate() {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            slug: slugify(name),
            supplier_id: suppliers[*supplier_index].id.clone(),
            status: ProductStatus::Available,
            description: Some(format!("{name} fra {}", suppliers[*supplier_index].name)),
            search_keywords: None,
            unit: ProductUnit::SquareMeter,
            vat_rate_bps: 2500,
            display_price: true,
            can_be_purchased_online: true,
            can_be_picked_up: true,
            created_at: now,
            updated_at: now,
        };

        let category_ids: Vec<String> = categories
            .iter()
            .filter(|c| c.slug == *category_slug)
            .map(|c| c.id.clone())
            .collect();
        let color_ids = vec![colors[index % colors.len()].id.clone()];
        let shape_ids = vec![shapes[index % shapes.len()].id.clone()];

        let mut tx = db.begin().await?;
        db.products().insert(&mut *tx, &product).await?;
        db.categories().set_for_product(&mut tx, &product.id, &category_ids).await?;
        attributes.set_colors_for_product(&mut tx, &product.id, &color_ids).await?;
        attributes.set_shapes_for_product(&mut tx, &product.id, &shape_ids).await?;
        for (size, addon) in &sizes {
            let option = ProductOption {
                id: Uuid::new_v4().to_string(),
                product_id: product.id.clone(),
                variant_id: None,
                size_id: Some(size.id.clone()),
                gross_price_cents: base_price + addon,
                status: ProductStatus::Available,
                created_at: now,
                updated_at: now,
            };
            db.products().insert_option(&mut *tx, &option).await?;
        }
        tx.commit().await?;

        info!(slug = %product.slug, options = sizes.len(), "Created product");
        first_product_id.get_or_insert(product.id);
    }

    // One running sale
    if let Some(product_id) = first_product_id {
        let discount = Discount {
            id: Uuid::new_v4().to_string(),
            name: "Høstsalg".to_string(),
            slug: "hostsalg".to_string(),
            description: None,
            discount_percentage_bps: Some(2000),
            fixed_price_cents: None,
            active_at: now - Duration::days(1),
            active_until: Some(now + Duration::days(30)),
            maximum_sold_quantity: None,
            total_sold_quantity: 0,
            display_in_navbar: true,
            created_at: now,
            updated_at: now,
        };

        let mut tx = db.begin().await?;
        db.discounts().insert(&mut *tx, &discount).await?;
        db.discounts().set_products(&mut tx, &discount.id, &[product_id]).await?;
        tx.commit().await?;
        info!(slug = %discount.slug, "Created discount");
    }

    info!("Seed complete");
    Ok(())
}

fn category(
    name: &str,
    parent_id: Option<&str>,
    ordering: i64,
    now: chrono::DateTime<Utc>,
) -> Category {
    Category {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        slug: slugify(name),
        description: None,
        parent_id: parent_id.map(str::to_string),
        ordering,
        display_in_navbar: true,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
