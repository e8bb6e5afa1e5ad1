use serde::{Deserialize, Serialize};

/// One letter tile. Identity is the server-assigned `id`; two tiles with the
/// same glyph are still distinct objects. A tile is never mutated after it
/// arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub id: i64,
    /// Rendered glyph when it differs from the canonical letter (blanks,
    /// ligatures). Omitted on the wire when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    pub value: String,
    #[serde(default, skip_serializing_if = "score_is_zero")]
    pub score: i32,
}

fn score_is_zero(score: &i32) -> bool {
    *score == 0
}

impl Tile {
    pub fn new(id: i64, value: impl Into<String>) -> Self {
        Tile {
            id,
            display: None,
            value: value.into(),
            score: 0,
        }
    }

    /// The glyph to render; falls back to the canonical letter.
    pub fn glyph(&self) -> &str {
        self.display.as_deref().unwrap_or(&self.value)
    }
}

/// Server-logical grid coordinates as they appear on the wire. `x` runs along
/// the column axis, `y` along the row axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub fn new(x: i32, y: i32) -> Self {
        Pos { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyph_falls_back_to_value() {
        let plain = Tile::new(1, "A");
        assert_eq!(plain.glyph(), "A");

        let blank = Tile {
            display: Some("?".to_string()),
            ..Tile::new(2, "E")
        };
        assert_eq!(blank.glyph(), "?");
        assert_eq!(blank.value, "E");
    }

    #[test]
    fn test_wire_shape_omits_empty_fields() {
        let tile = Tile::new(7, "Q");
        let json = serde_json::to_value(&tile).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["value"], "Q");
        assert!(json.get("display").is_none());
        assert!(json.get("score").is_none());
    }

    #[test]
    fn test_identity_is_by_id() {
        // Two tiles with the same letter are distinct objects on the wire.
        let first = Tile::new(1, "A");
        let second = Tile::new(2, "A");
        assert_ne!(first, second);
    }
}
