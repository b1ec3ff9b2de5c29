//! Cache key normalization

use std::fmt;
use super::policy::Category;

/// A normalized key: trimmed, lower-cased identifier plus the category discriminator.
///
/// `"  BitCoin "` under [`Category::Price`] becomes `bitcoin_price`, so lookups
/// are case-insensitive and two categories never collide on the same identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    id: String,
    category: Category,
}

impl CacheKey {
    /// Build a key for `id` in `category`. Returns `None` when the identifier is blank.
    pub fn new(category: Category, id: &str) -> Option<Self> {
        let id = normalize_id(id);
        if id.is_empty() {
            return None;
        }
        Some(Self { id, category })
    }

    /// Normalized identifier without the suffix
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.id, self.category.key_suffix())
    }
}

/// Trim and lower-case a coin id or symbol
pub fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_case_insensitive() {
        let upper = CacheKey::new(Category::AiAdvice, "ETH").unwrap();
        let lower = CacheKey::new(Category::AiAdvice, " eth ").unwrap();

        assert_eq!(upper, lower);
        assert_eq!(upper.to_string(), "eth_advice");
        assert_eq!(upper.id(), "eth");
    }

    #[test]
    fn test_categories_get_distinct_keys() {
        let price = CacheKey::new(Category::Price, "bitcoin").unwrap();
        let volume = CacheKey::new(Category::Volume, "bitcoin").unwrap();

        assert_ne!(price.to_string(), volume.to_string());
        assert_eq!(price.to_string(), "bitcoin_price");
    }

    #[test]
    fn test_blank_identifier_has_no_key() {
        assert!(CacheKey::new(Category::Price, "").is_none());
        assert!(CacheKey::new(Category::Price, "   ").is_none());
    }
}
