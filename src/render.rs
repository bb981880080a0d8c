//! Post text rendering
//!
//! Turns a [`ContentItem`] into the text handed to the actuator. Blocks are
//! separated by a blank line.
//!
//! Primary: body, date stamp, hashtags, signature.
//! Secondary: introduction, caption lines, hashtags; the link travels as the
//! media reference so the platform builds its preview.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};

use crate::config::RenderConfig;
use crate::models::{ContentItem, Payload, RenderedContent};

/// Whether `format` is a usable chrono format string
pub fn is_valid_date_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Renders content items for publication
#[derive(Debug, Clone)]
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render an item as of `now`
    pub fn render(&self, item: &ContentItem, now: DateTime<Utc>) -> RenderedContent {
        match &item.payload {
            Payload::Text { body } => {
                let mut blocks = vec![body.trim().to_string()];

                if self.config.date_stamp && is_valid_date_format(&self.config.date_format) {
                    blocks.push(format!("📅 {}", now.format(&self.config.date_format)));
                }
                push_optional(&mut blocks, self.config.hashtags.as_deref());
                push_optional(&mut blocks, self.config.signature.as_deref());

                RenderedContent {
                    text: blocks.join("\n\n"),
                    media_reference: None,
                }
            }
            Payload::Link {
                reference,
                caption_fragments,
            } => {
                let mut blocks = Vec::new();

                push_optional(&mut blocks, self.config.secondary_intro.as_deref());
                if !caption_fragments.is_empty() {
                    blocks.push(caption_fragments.join("\n"));
                }
                push_optional(&mut blocks, self.config.hashtags.as_deref());

                RenderedContent {
                    text: blocks.join("\n\n"),
                    media_reference: Some(reference.clone()),
                }
            }
        }
    }
}

fn push_optional(blocks: &mut Vec<String>, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        blocks.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 25, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_render_primary_full() {
        let renderer = Renderer::new(RenderConfig {
            hashtags: Some("#fe #esperanza".into()),
            signature: Some("— Iglesia Central".into()),
            ..RenderConfig::default()
        });
        let item = ContentItem::text("a.txt", "El Señor es mi pastor");

        let rendered = renderer.render(&item, now());
        assert_eq!(
            rendered.text,
            "El Señor es mi pastor\n\n📅 25/12/2024\n\n#fe #esperanza\n\n— Iglesia Central"
        );
        assert!(rendered.media_reference.is_none());
    }

    #[test]
    fn test_render_primary_plain() {
        let renderer = Renderer::new(RenderConfig {
            date_stamp: false,
            ..RenderConfig::default()
        });
        let item = ContentItem::text("a.txt", "Salmo 91");
        assert_eq!(renderer.render(&item, now()).text, "Salmo 91");
    }

    #[test]
    fn test_render_secondary() {
        let renderer = Renderer::new(RenderConfig {
            secondary_intro: Some("Predicación de hoy".into()),
            hashtags: Some("#sermon".into()),
            ..RenderConfig::default()
        });
        let item = ContentItem::link(
            "item-001.txt",
            "https://youtu.be/abc",
            vec!["Fe que mueve montañas".into()],
        );

        let rendered = renderer.render(&item, now());
        assert_eq!(
            rendered.text,
            "Predicación de hoy\n\nFe que mueve montañas\n\n#sermon"
        );
        assert_eq!(rendered.media_reference.as_deref(), Some("https://youtu.be/abc"));
    }

    #[test]
    fn test_date_format_validation() {
        assert!(is_valid_date_format("%d/%m/%Y"));
        assert!(!is_valid_date_format("%Q"));
    }
}
