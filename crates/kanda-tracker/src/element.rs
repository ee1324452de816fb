//! Click target description and identification.

use std::collections::BTreeMap;

use rand::Rng;

const ID_TEXT_LIMIT: usize = 50;
const ELEMENT_TEXT_LIMIT: usize = 100;
const FALLBACK_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// What the click listener knows about one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementDescriptor {
    pub tag: String,
    pub id: Option<String>,
    pub class_name: Option<String>,
    /// Visible text content.
    pub text: Option<String>,
    /// Every other attribute (`role`, `aria-label`, `data-track-*`, ...).
    pub attributes: BTreeMap<String, String>,
}

impl ElementDescriptor {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_lowercase(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The `role` attribute when set, else the tag name.
    pub fn element_type(&self) -> String {
        non_blank(self.attr("role"))
            .unwrap_or(&self.tag)
            .to_string()
    }

    /// Trimmed visible text, at most 100 characters.
    pub fn element_text(&self) -> Option<String> {
        non_blank(self.text.as_deref().map(str::trim))
            .map(|t| t.chars().take(ELEMENT_TEXT_LIMIT).collect())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Buttons, links, `role="button"` and anything opted in with
/// `data-track-click`.
pub fn is_trackable(element: &ElementDescriptor) -> bool {
    matches!(element.tag.as_str(), "button" | "a")
        || element.attr("role") == Some("button")
        || element.attributes.contains_key("data-track-click")
}

/// The nearest trackable element on the path from the click target up to
/// the document root. `path[0]` is the target.
pub fn closest_trackable(path: &[ElementDescriptor]) -> Option<&ElementDescriptor> {
    path.iter().find(|el| is_trackable(el))
}

/// Human-readable identifier for a clicked element. The first non-empty of:
/// `data-track-name`, DOM id, `data-track-id`, `aria-label`, visible text
/// (first 50 characters), class name. Otherwise `<tag>-<9 random chars>`,
/// so two unlabeled elements never share an id.
pub fn resolve_element_id(element: &ElementDescriptor) -> String {
    let text = element
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.chars().take(ID_TEXT_LIMIT).collect::<String>());

    non_blank(element.attr("data-track-name"))
        .or(non_blank(element.id.as_deref()))
        .or(non_blank(element.attr("data-track-id")))
        .or(non_blank(element.attr("aria-label")))
        .map(str::to_string)
        .or(text)
        .or_else(|| non_blank(element.class_name.as_deref()).map(str::to_string))
        .unwrap_or_else(|| format!("{}-{}", element.tag, random_token(9)))
}

fn random_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| FALLBACK_ALPHABET[rng.gen_range(0..FALLBACK_ALPHABET.len())] as char)
        .collect()
}
