//! ProductCatalog - immutable lookup table for products and tier grants.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::{CatalogError, Product, ProductCategory, TierGrant};
use crate::domain::foundation::{ProductId, RoleId};
use crate::domain::tiers::CommunityTier;

/// On-disk shape of the catalog document.
#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    products: Vec<Product>,
    #[serde(default)]
    tier_grants: Vec<TierGrant>,
}

/// Static mapping from commerce products to chat-platform access.
///
/// Built once at startup and shared as `Arc<ProductCatalog>`. Lookups never
/// fail; an unknown id is simply `None`.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    products: Vec<Product>,
    by_product_id: HashMap<ProductId, usize>,
    by_role_id: HashMap<RoleId, usize>,
    tier_grants: HashMap<CommunityTier, TierGrant>,
}

impl ProductCatalog {
    /// Builds a catalog, validating product and role uniqueness and tier levels.
    pub fn new(products: Vec<Product>, tier_grants: Vec<TierGrant>) -> Result<Self, CatalogError> {
        let mut by_product_id = HashMap::with_capacity(products.len());
        let mut by_role_id = HashMap::with_capacity(products.len());

        for (index, product) in products.iter().enumerate() {
            match (product.category, product.tier_level) {
                (ProductCategory::SubscriptionTier, None) => {
                    return Err(CatalogError::MissingTierLevel(
                        product.external_product_id.to_string(),
                    ));
                }
                (ProductCategory::OneOffService, Some(_)) => {
                    return Err(CatalogError::UnexpectedTierLevel(
                        product.external_product_id.to_string(),
                    ));
                }
                _ => {}
            }

            if by_product_id
                .insert(product.external_product_id.clone(), index)
                .is_some()
            {
                return Err(CatalogError::DuplicateProduct(
                    product.external_product_id.to_string(),
                ));
            }
            // Reverse lookup and revocation both assume one product per role.
            if by_role_id
                .insert(product.access_role_id.clone(), index)
                .is_some()
            {
                return Err(CatalogError::DuplicateRole(
                    product.access_role_id.to_string(),
                ));
            }
        }

        let mut grants = HashMap::with_capacity(tier_grants.len());
        for grant in tier_grants {
            let tier = grant.tier;
            if grants.insert(tier, grant).is_some() {
                return Err(CatalogError::DuplicateTierGrant(tier.to_string()));
            }
        }

        Ok(Self {
            products,
            by_product_id,
            by_role_id,
            tier_grants: grants,
        })
    }

    /// Parses and validates a YAML catalog document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_yaml::from_str(yaml)?;
        Self::new(document.products, document.tier_grants)
    }

    /// Loads a YAML catalog from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn lookup_by_external_product_id(&self, id: &ProductId) -> Option<&Product> {
        self.by_product_id.get(id).map(|&index| &self.products[index])
    }

    pub fn lookup_by_access_role_id(&self, id: &RoleId) -> Option<&Product> {
        self.by_role_id.get(id).map(|&index| &self.products[index])
    }

    pub fn all_of_category(&self, category: ProductCategory) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|product| product.category == category)
            .collect()
    }

    /// Role/channel destination for a tier, if one is configured.
    pub fn tier_grant(&self, tier: CommunityTier) -> Option<&TierGrant> {
        self.tier_grants.get(&tier)
    }

    /// All configured tier grants, lowest tier first.
    pub fn tier_grants(&self) -> Vec<&TierGrant> {
        let mut grants: Vec<_> = self.tier_grants.values().collect();
        grants.sort_by_key(|grant| grant.tier);
        grants
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ChannelId;
    use crate::domain::tiers::TierLevel;
    use std::io::Write;

    const CATALOG_YAML: &str = r#"
products:
  - external_product_id: masterclass-beginner
    access_role_id: "1444829030263165109"
    category: subscription-tier
    tier_level: beginner
    name: Beginner Masterclass
  - external_product_id: masterclass-advanced
    access_role_id: "1444829551984378027"
    category: subscription-tier
    tier_level: advanced
    channel_id: "2000000000000000003"
  - external_product_id: coaching-single
    access_role_id: "3000000000000000001"
    category: one-off-service
    channel_id: "3100000000000000001"
tier_grants:
  - tier: BASIC
    access_role_id: "4000000000000000001"
    channel_id: "4100000000000000001"
  - tier: APEX
    access_role_id: "4000000000000000003"
"#;

    fn product(
        id: &str,
        role: &str,
        category: ProductCategory,
        level: Option<TierLevel>,
    ) -> Product {
        Product {
            external_product_id: ProductId::new(id).unwrap(),
            access_role_id: RoleId::new(role).unwrap(),
            category,
            tier_level: level,
            channel_id: None,
            name: None,
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Lookup Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parses_yaml_catalog() {
        let catalog = ProductCatalog::from_yaml_str(CATALOG_YAML).unwrap();
        assert_eq!(catalog.len(), 3);

        let advanced = catalog
            .lookup_by_external_product_id(&ProductId::new("masterclass-advanced").unwrap())
            .unwrap();
        assert_eq!(advanced.tier_level, Some(TierLevel::Advanced));
        assert_eq!(
            advanced.channel_id,
            Some(ChannelId::new("2000000000000000003").unwrap())
        );
    }

    #[test]
    fn lookup_by_role_id_finds_product() {
        let catalog = ProductCatalog::from_yaml_str(CATALOG_YAML).unwrap();
        let found = catalog
            .lookup_by_access_role_id(&RoleId::new("3000000000000000001").unwrap())
            .unwrap();
        assert_eq!(found.external_product_id.as_str(), "coaching-single");
    }

    #[test]
    fn unknown_ids_return_none() {
        let catalog = ProductCatalog::from_yaml_str(CATALOG_YAML).unwrap();
        assert!(catalog
            .lookup_by_external_product_id(&ProductId::new("missing").unwrap())
            .is_none());
        assert!(catalog
            .lookup_by_access_role_id(&RoleId::new("999").unwrap())
            .is_none());
    }

    #[test]
    fn all_of_category_filters() {
        let catalog = ProductCatalog::from_yaml_str(CATALOG_YAML).unwrap();
        assert_eq!(catalog.all_of_category(ProductCategory::SubscriptionTier).len(), 2);
        assert_eq!(catalog.all_of_category(ProductCategory::OneOffService).len(), 1);
    }

    #[test]
    fn tier_grants_are_optional_per_tier() {
        let catalog = ProductCatalog::from_yaml_str(CATALOG_YAML).unwrap();
        assert!(catalog.tier_grant(CommunityTier::Basic).is_some());
        assert!(catalog.tier_grant(CommunityTier::Elite).is_none());

        let tiers: Vec<_> = catalog.tier_grants().iter().map(|g| g.tier).collect();
        assert_eq!(tiers, vec![CommunityTier::Basic, CommunityTier::Apex]);
    }

    #[test]
    fn label_falls_back_to_product_id() {
        let catalog = ProductCatalog::from_yaml_str(CATALOG_YAML).unwrap();
        let named = catalog
            .lookup_by_external_product_id(&ProductId::new("masterclass-beginner").unwrap())
            .unwrap();
        let unnamed = catalog
            .lookup_by_external_product_id(&ProductId::new("coaching-single").unwrap())
            .unwrap();
        assert_eq!(named.label(), "Beginner Masterclass");
        assert_eq!(unnamed.label(), "coaching-single");
    }

    // ══════════════════════════════════════════════════════════════
    // Validation Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn rejects_duplicate_product_ids() {
        let result = ProductCatalog::new(
            vec![
                product("p1", "r1", ProductCategory::OneOffService, None),
                product("p1", "r2", ProductCategory::OneOffService, None),
            ],
            vec![],
        );
        assert!(matches!(result, Err(CatalogError::DuplicateProduct(id)) if id == "p1"));
    }

    #[test]
    fn rejects_products_sharing_a_role() {
        let result = ProductCatalog::new(
            vec![
                product("p1", "shared", ProductCategory::OneOffService, None),
                product("p2", "shared", ProductCategory::OneOffService, None),
            ],
            vec![],
        );
        assert!(matches!(result, Err(CatalogError::DuplicateRole(id)) if id == "shared"));
    }

    #[test]
    fn rejects_subscription_tier_without_level() {
        let result = ProductCatalog::new(
            vec![product("p1", "r1", ProductCategory::SubscriptionTier, None)],
            vec![],
        );
        assert!(matches!(result, Err(CatalogError::MissingTierLevel(_))));
    }

    #[test]
    fn rejects_one_off_with_level() {
        let result = ProductCatalog::new(
            vec![product(
                "p1",
                "r1",
                ProductCategory::OneOffService,
                Some(TierLevel::Beginner),
            )],
            vec![],
        );
        assert!(matches!(result, Err(CatalogError::UnexpectedTierLevel(_))));
    }

    #[test]
    fn rejects_duplicate_tier_grants() {
        let grant = TierGrant {
            tier: CommunityTier::Elite,
            access_role_id: RoleId::new("r").unwrap(),
            channel_id: None,
        };
        let result = ProductCatalog::new(vec![], vec![grant.clone(), grant]);
        assert!(matches!(result, Err(CatalogError::DuplicateTierGrant(_))));
    }

    #[test]
    fn rejects_empty_role_id_in_yaml() {
        let yaml = r#"
products:
  - external_product_id: p1
    access_role_id: ""
    category: one-off-service
"#;
        assert!(matches!(
            ProductCatalog::from_yaml_str(yaml),
            Err(CatalogError::Parse(_))
        ));
    }

    // ══════════════════════════════════════════════════════════════
    // File Loading Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn loads_catalog_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CATALOG_YAML.as_bytes()).unwrap();

        let catalog = ProductCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.products().len(), 3);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ProductCatalog::load(dir.path().join("absent.yaml"));
        assert!(matches!(result, Err(CatalogError::Io { .. })));
    }
}
