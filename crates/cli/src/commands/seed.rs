//! Seed the catalog from a YAML file.
//!
//! The file is a list of products:
//!
//! ```yaml
//! - name: Kanchipuram Silk Saree
//!   category: Sarees
//!   price: 4200
//!   old_price: 4800
//!   stock: 12
//! - name: Brass Diya (set of 2)
//!   category: Home
//!   price: 350
//!   stock: 40
//!   active: false
//! ```
//!
//! Products are matched by name: existing rows are updated in place, so the
//! command can be re-run after editing the file.

use std::collections::HashSet;
use std::path::Path;

use bazaar_storefront::db::{self, CatalogStore, ProductRepository};
use bazaar_storefront::models::NewProduct;
use tracing::{error, info};

/// Parse the YAML product list.
fn parse_products(content: &str) -> Result<Vec<NewProduct>, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

/// Collect every problem in the product list (empty when valid).
fn validate_products(products: &[NewProduct]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();

    for (index, product) in products.iter().enumerate() {
        let entry = index + 1;
        let name = product.name.trim();
        if name.is_empty() {
            errors.push(format!("entry {entry}: name is required"));
        } else if !names.insert(name.to_lowercase()) {
            errors.push(format!("entry {entry}: duplicate product name {name:?}"));
        }
        if product.price.is_sign_negative() {
            errors.push(format!("entry {entry}: price cannot be negative"));
        }
        if product.old_price.is_some_and(|p| p.is_sign_negative()) {
            errors.push(format!("entry {entry}: old_price cannot be negative"));
        }
    }

    errors
}

/// Upsert products from a YAML file.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the file cannot be read
/// or fails validation, or the database is unreachable.
pub async fn products(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let database_url =
        super::database_url().ok_or("STOREFRONT_DATABASE_URL (or DATABASE_URL) not set")?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");
    let content = tokio::fs::read_to_string(path).await?;
    let products = parse_products(&content)?;
    info!(products = products.len(), "Parsed product list");

    let errors = validate_products(&products);
    if !errors.is_empty() {
        error!("Product list validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");
    let repo = ProductRepository::new(pool);

    let mut upserted = 0_usize;
    let mut failed = Vec::new();
    for product in &products {
        match repo.upsert_product(product).await {
            Ok(stored) => {
                upserted += 1;
                info!(id = %stored.id, name = %stored.name, stock = stored.stock, "Product upserted");
            }
            Err(e) => failed.push((product.name.clone(), e)),
        }
    }

    info!("Seeding complete");
    info!("  Products upserted: {upserted}");
    if !failed.is_empty() {
        error!("  Errors: {}", failed.len());
        for (name, err) in &failed {
            error!("    - {name}: {err}");
        }
        return Err(format!("{} products failed to load", failed.len()).into());
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_parse_products() {
        let yaml = r"
- name: Kanchipuram Silk Saree
  category: Sarees
  price: 4200
  old_price: 4800
  stock: 12
- name: Brass Diya
  price: 350.50
  stock: 40
  active: false
";
        let products = parse_products(yaml).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].old_price, Some(Decimal::from(4800)));
        assert!(products[0].is_active);
        assert_eq!(products[1].category, "");
        assert_eq!(products[1].price, Decimal::new(35050, 2));
        assert!(!products[1].is_active);
    }

    #[test]
    fn test_negative_stock_rejected_by_parser() {
        let yaml = "- name: Clay Pot\n  price: 60\n  stock: -1\n";
        assert!(parse_products(yaml).is_err());
    }

    #[test]
    fn test_validate_products() {
        let yaml = r"
- name: Clay Pot
  price: 60
  stock: 5
- name: '  '
  price: 10
  stock: 1
- name: clay pot
  price: -5
  stock: 1
";
        let errors = validate_products(&parse_products(yaml).unwrap());
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("name is required"));
        assert!(errors[1].contains("duplicate"));
        assert!(errors[2].contains("price cannot be negative"));
    }
}
