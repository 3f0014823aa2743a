//! Style ids, inline appearances and the engine-wide name registry.

use std::collections::HashMap;

/// Style ID type
pub type StyleId = u32;

/// Id of the built-in `"default"` style, used for text no token rule claims.
pub const DEFAULT_STYLE_ID: StyleId = 0;

/// Name of the built-in default style.
pub const DEFAULT_STYLE_NAME: &str = "default";

/// A style that carries its final appearance instead of an id.
///
/// Colors are packed ARGB (`0xAARRGGBB`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct InlineStyle {
    /// Foreground color.
    pub foreground: u32,
    /// Background color.
    pub background: u32,
    /// Bold text.
    pub bold: bool,
    /// Italic text.
    pub italic: bool,
    /// Struck-through text.
    pub strikethrough: bool,
}

impl InlineStyle {
    /// Tag bit for [`InlineStyle::bold`].
    pub const TAG_BOLD: i32 = 1;
    /// Tag bit for [`InlineStyle::italic`].
    pub const TAG_ITALIC: i32 = 1 << 1;
    /// Tag bit for [`InlineStyle::strikethrough`].
    pub const TAG_STRIKETHROUGH: i32 = 1 << 2;

    /// Pack the font tags into the bit set used by the span buffer.
    pub fn tag_bits(&self) -> i32 {
        let mut bits = 0;
        if self.bold {
            bits |= Self::TAG_BOLD;
        }
        if self.italic {
            bits |= Self::TAG_ITALIC;
        }
        if self.strikethrough {
            bits |= Self::TAG_STRIKETHROUGH;
        }
        bits
    }

    /// Rebuild a style from its packed form.
    pub fn from_packed(foreground: u32, background: u32, tag_bits: i32) -> Self {
        Self {
            foreground,
            background,
            bold: tag_bits & Self::TAG_BOLD != 0,
            italic: tag_bits & Self::TAG_ITALIC != 0,
            strikethrough: tag_bits & Self::TAG_STRIKETHROUGH != 0,
        }
    }

    /// Apply a grammar tag name (`"bold"`, `"italic"`, `"strikethrough"`).
    ///
    /// Returns `false` for unknown tags.
    pub fn apply_tag(&mut self, tag: &str) -> bool {
        match tag {
            "bold" => self.bold = true,
            "italic" => self.italic = true,
            "strikethrough" => self.strikethrough = true,
            _ => return false,
        }
        true
    }
}

/// The style attached to a token span.
///
/// An engine produces only one of the two variants, chosen by
/// [`HighlightConfig::inline_style`](crate::HighlightConfig::inline_style).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleValue {
    /// A numeric id resolved through the engine's [`StyleRegistry`].
    Id(StyleId),
    /// A fully resolved appearance.
    Inline(InlineStyle),
}

impl Default for StyleValue {
    fn default() -> Self {
        Self::Id(DEFAULT_STYLE_ID)
    }
}

impl StyleValue {
    /// The id, if this is an id style.
    pub fn id(&self) -> Option<StyleId> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Inline(_) => None,
        }
    }

    /// The inline appearance, if this is an inline style.
    pub fn inline(&self) -> Option<&InlineStyle> {
        match self {
            Self::Id(_) => None,
            Self::Inline(style) => Some(style),
        }
    }
}

/// Bidirectional style name ↔ id table.
///
/// `"default"` is always registered as id 0. Names created on demand receive the smallest
/// unused id above the last one handed out, so ids registered up front by the host are never
/// reused.
#[derive(Debug, Clone)]
pub struct StyleRegistry {
    name_to_id: HashMap<String, StyleId>,
    id_to_name: HashMap<StyleId, String>,
    next_id: StyleId,
}

impl Default for StyleRegistry {
    fn default() -> Self {
        let mut registry = Self {
            name_to_id: HashMap::new(),
            id_to_name: HashMap::new(),
            next_id: DEFAULT_STYLE_ID + 1,
        };
        registry.register_style_name(DEFAULT_STYLE_NAME, DEFAULT_STYLE_ID);
        registry
    }
}

impl StyleRegistry {
    /// Create a registry holding only the default style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to a host-chosen `id`, replacing any previous binding of either side.
    pub fn register_style_name(&mut self, name: &str, id: StyleId) {
        if let Some(old_id) = self.name_to_id.insert(name.to_string(), id)
            && old_id != id
        {
            self.id_to_name.remove(&old_id);
        }
        if let Some(old_name) = self.id_to_name.insert(id, name.to_string())
            && old_name != name
        {
            self.name_to_id.remove(&old_name);
        }
    }

    /// Look up the id bound to `name`.
    pub fn style_id(&self, name: &str) -> Option<StyleId> {
        self.name_to_id.get(name).copied()
    }

    /// Return the id bound to `name`, allocating a fresh one if needed.
    pub fn get_or_create_style_id(&mut self, name: &str) -> StyleId {
        if let Some(id) = self.style_id(name) {
            return id;
        }
        while self.id_to_name.contains_key(&self.next_id) {
            self.next_id += 1;
        }
        let id = self.next_id;
        self.name_to_id.insert(name.to_string(), id);
        self.id_to_name.insert(id, name.to_string());
        id
    }

    /// Name bound to `id`.
    pub fn style_name(&self, id: StyleId) -> Option<&str> {
        self.id_to_name.get(&id).map(String::as_str)
    }

    /// Number of registered names (the default style included).
    pub fn len(&self) -> usize {
        self.name_to_id.len()
    }

    /// Always `false`: the default style is permanently registered.
    pub fn is_empty(&self) -> bool {
        self.name_to_id.is_empty()
    }
}

/// Parse a `#RRGGBB` or `#AARRGGBB` color into packed ARGB.
///
/// Six digits get an opaque alpha; anything that is not 6 or 8 hex digits yields 0.
pub fn parse_color(text: &str) -> u32 {
    let digits = text.strip_prefix('#').unwrap_or(text);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return 0;
    }
    let Ok(value) = u32::from_str_radix(digits, 16) else {
        return 0;
    };
    match digits.len() {
        6 => 0xFF00_0000 | value,
        8 => value,
        _ => 0,
    }
}
