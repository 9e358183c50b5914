use nanoserde::DeJson;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MenuError {
    #[error("Invalid menu JSON: {0}")]
    Json(String),
    #[error("Menu entry {index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },
}

/// One entry of the menu (a dish category). Pure data, the adapter owns everything view related.
#[derive(DeJson, Clone, Debug, PartialEq, Eq)]
pub struct MenuRow {
    pub name: String,
    pub image_url: String,
}

impl MenuRow {
    pub fn new(name: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image_url: image_url.into(),
        }
    }
}

/// Parses a menu document of the form `[{"name": "...", "image_url": "..."}, ...]`
pub fn parse_menu(json_data: &str) -> Result<Vec<MenuRow>, MenuError> {
    let rows: Vec<MenuRow> =
        DeJson::deserialize_json(json_data).map_err(|e| MenuError::Json(format!("{:?}", e)))?;

    for (index, row) in rows.iter().enumerate() {
        if row.name.is_empty() {
            return Err(MenuError::EmptyField { index, field: "name" });
        }
        if row.image_url.is_empty() {
            return Err(MenuError::EmptyField { index, field: "image_url" });
        }
    }

    Ok(rows)
}
