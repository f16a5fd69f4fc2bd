use std::path::PathBuf;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Directory holding one `<sheet>.csv` file per sheet.
    pub inventory_dir: PathBuf,
    pub sheet_name: String,
    /// Days between "Date Started" and "Date Ready" for a tincture.
    pub steep_days: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            inventory_dir: std::env::var("INVENTORY_DIR")
                .unwrap_or_else(|_| "./data".to_string())
                .into(),
            sheet_name: std::env::var("INVENTORY_SHEET")
                .unwrap_or_else(|_| "Inventory".to_string()),
            steep_days: std::env::var("TINCTURE_STEEP_DAYS")
                .unwrap_or_else(|_| "42".to_string())
                .parse()
                .context("TINCTURE_STEEP_DAYS must be a whole number of days")?,
        })
    }
}
