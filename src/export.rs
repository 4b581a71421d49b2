use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{EmbedError, Result};

/// One projected word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedWord {
    /// Label as embedded, trailing separator included
    pub word: String,
    pub x: f64,
    pub y: f64,
}

/// 2D projection of a word list, saved so the plot can be redrawn without the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionExport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub points: Vec<ProjectedWord>,
}

impl ProjectionExport {
    pub fn new(title: Option<String>, labels: &[String], points: &[[f64; 2]]) -> Self {
        let points = labels
            .iter()
            .zip(points.iter())
            .map(|(word, point)| ProjectedWord {
                word: word.clone(),
                x: point[0],
                y: point[1],
            })
            .collect();
        Self { title, points }
    }

    pub fn labels(&self) -> Vec<String> {
        self.points.iter().map(|p| p.word.clone()).collect()
    }

    pub fn coordinates(&self) -> Vec<[f64; 2]> {
        self.points.iter().map(|p| [p.x, p.y]).collect()
    }

    /// Save projection to JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|e| EmbedError::json(path, e))?;
        fs::write(path, json).map_err(|e| EmbedError::io(path, e))?;
        println!("💾 Projection saved to: {}", path.display());
        Ok(())
    }

    /// Load projection from JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| EmbedError::io(path, e))?;
        serde_json::from_str(&json).map_err(|e| EmbedError::json(path, e))
    }
}
