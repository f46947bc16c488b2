use crate::config::DEFAULT_CATEGORY_ID;
use crate::error::{AppError, AppResult};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub color: String,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Synthesized on every read, never stored.
pub static DEFAULT_CATEGORY: Lazy<Category> = Lazy::new(|| Category {
    id: DEFAULT_CATEGORY_ID.to_string(),
    name: "Default".to_string(),
    color: "#6B7280".to_string(),
    icon: "📝".to_string(),
    description: None,
});

/// Written the first time a store is initialized.
pub fn seed_categories() -> Vec<Category> {
    vec![
        Category {
            id: "home".to_string(),
            name: "Home".to_string(),
            color: "#10B981".to_string(),
            icon: "home".to_string(),
            description: None,
        },
        Category {
            id: "work".to_string(),
            name: "Work".to_string(),
            color: "#3B82F6".to_string(),
            icon: "briefcase".to_string(),
            description: None,
        },
    ]
}

impl Category {
    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_CATEGORY_ID
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.id.trim().is_empty() {
            return Err(AppError::validation("category id is empty"));
        }
        if self.name.trim().is_empty() {
            return Err(AppError::validation(format!(
                "category {} has an empty name",
                self.id
            )));
        }
        if !is_hex_color(&self.color) {
            return Err(AppError::validation(format!(
                "category {} color `{}` is not #RRGGBB",
                self.id, self.color
            )));
        }
        Ok(())
    }
}

fn is_hex_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Default category first, then the stored ones minus any stray default entry.
pub fn with_default(stored: Vec<Category>) -> Vec<Category> {
    let mut categories = Vec::with_capacity(stored.len() + 1);
    categories.push(DEFAULT_CATEGORY.clone());
    categories.extend(stored.into_iter().filter(|c| !c.is_default()));
    categories
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: &str, color: &str) -> Category {
        Category {
            id: id.to_string(),
            name: "Errands".to_string(),
            color: color.to_string(),
            icon: "cart".to_string(),
            description: None,
        }
    }

    #[test]
    fn test_color_validation() {
        assert!(category("errands", "#a1B2c3").validate().is_ok());
        assert!(category("errands", "a1B2c3").validate().is_err());
        assert!(category("errands", "#a1B2c").validate().is_err());
        assert!(category("errands", "#zzzzzz").validate().is_err());
    }

    #[test]
    fn test_with_default_puts_default_first_once() {
        let stored = vec![category("default", "#000000"), category("errands", "#111111")];
        let all = with_default(stored);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], *DEFAULT_CATEGORY);
        assert_eq!(all[1].id, "errands");
    }

    #[test]
    fn test_seed_does_not_contain_default() {
        assert!(seed_categories().iter().all(|c| !c.is_default()));
        assert!(seed_categories().iter().all(|c| c.validate().is_ok()));
    }
}
