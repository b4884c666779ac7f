//! Placeholder menu images for the landing page demo.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FoodItem {
    pub name: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
}

pub const DEMO_ITEMS: [FoodItem; 4] = [
    FoodItem {
        name: "Garlic Bread",
        color: "#8B4513",
        icon: "\u{1F35E}",
    },
    FoodItem {
        name: "Mozzarella Sticks",
        color: "#FFA500",
        icon: "\u{1F9C0}",
    },
    FoodItem {
        name: "Spaghetti",
        color: "#FF6347",
        icon: "\u{1F35D}",
    },
    FoodItem {
        name: "Salmon",
        color: "#FA8072",
        icon: "\u{1F41F}",
    },
];

/// Lowercase, whitespace runs collapsed to `-`: "Garlic Bread" -> "garlic-bread".
#[must_use]
pub fn slug(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// 120x120 rounded tile with a diagonal gradient, the icon and the name.
#[must_use]
pub fn food_svg(item: &FoodItem) -> String {
    let id = slug(item.name);
    format!(
        r#"<svg width="120" height="120" xmlns="http://www.w3.org/2000/svg">
  <defs>
    <linearGradient id="grad-{id}" x1="0%" y1="0%" x2="100%" y2="100%">
      <stop offset="0%" style="stop-color:{color};stop-opacity:1" />
      <stop offset="100%" style="stop-color:{color}88;stop-opacity:1" />
    </linearGradient>
  </defs>
  <rect width="120" height="120" rx="10" ry="10" fill="url(#grad-{id})" />
  <text x="60" y="90" font-family="Arial" font-size="12" font-weight="bold" fill="white" text-anchor="middle">{name}</text>
  <text x="60" y="60" font-family="Arial" font-size="40" fill="white" text-anchor="middle" dominant-baseline="middle">{icon}</text>
</svg>
"#,
        color = item.color,
        name = item.name,
        icon = item.icon,
    )
}

/// Write one SVG per item into `dir`, creating it when missing.
///
/// # Errors
///
/// Fails when the directory or a file can't be written.
pub fn write_placeholders(dir: &Path, items: &[FoodItem]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut written = Vec::with_capacity(items.len());
    for item in items {
        let path = dir.join(format!("{}.svg", slug(item.name)));
        fs::write(&path, food_svg(item))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Generated {}", path.display());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_collapses_whitespace() {
        assert_eq!(slug("Garlic Bread"), "garlic-bread");
        assert_eq!(slug("Mozzarella  Sticks"), "mozzarella-sticks");
    }

    #[test]
    fn svg_carries_gradient_and_label() {
        let svg = food_svg(&DEMO_ITEMS[3]);
        assert!(svg.contains(r#"id="grad-salmon""#));
        assert!(svg.contains("stop-color:#FA807288"));
        assert!(svg.contains(">Salmon</text>"));
    }

    #[test]
    fn writes_one_file_per_item() -> Result<()> {
        let dir = std::env::temp_dir().join(format!("menuviz-images-{}", ulid::Ulid::new()));
        let nested = dir.join("public/images/menu");

        let written = write_placeholders(&nested, &DEMO_ITEMS)?;

        assert_eq!(written.len(), 4);
        assert!(nested.join("garlic-bread.svg").is_file());
        assert!(fs::read_to_string(nested.join("spaghetti.svg"))?.contains("#FF6347"));
        fs::remove_dir_all(&dir)?;
        Ok(())
    }
}
