use serde::{Deserialize, Serialize};
use std::path::Path;

/// A sensor or panel location in domain units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    #[serde(default)]
    pub id: Option<u32>,
    pub x: f64,
    pub y: f64,
}

/// Load panel coordinates from a CSV file with an `x,y` header (an `id` column is optional).
pub fn load_panels(path: &Path) -> Result<Vec<Panel>, String> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
    read_panels(&mut reader, path)
}

fn read_panels<R: std::io::Read>(reader: &mut csv::Reader<R>, source_path: &Path) -> Result<Vec<Panel>, String> {
    let mut panels = Vec::new();
    for (row, record) in reader.deserialize::<Panel>().enumerate() {
        // Row numbers are 1-based and skip the header
        let panel = record.map_err(|e| format!("{} row {}: {}", source_path.display(), row + 2, e))?;
        if !panel.x.is_finite() || !panel.y.is_finite() {
            return Err(format!(
                "{} row {}: coordinates must be finite, got ({}, {})",
                source_path.display(),
                row + 2,
                panel.x,
                panel.y
            ));
        }
        panels.push(panel);
    }
    Ok(panels)
}

/// Parse panels from CSV text.
pub fn panels_from_csv_str(content: &str, source_path: &Path) -> Result<Vec<Panel>, String> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    read_panels(&mut reader, source_path)
}
