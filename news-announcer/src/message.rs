use crate::types::{Category, NewsItem, RoleId};
use serde::Serialize;

const WINDOWS_COLOR: u32 = 0x3498db;
const LINUX_COLOR: u32 = 0xe67e22;
const MAX_TITLE_CHARS: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_mentions: Option<AllowedMentions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    pub url: String,
    pub description: String,
    pub color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllowedMentions {
    pub parse: Vec<String>,
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            embeds: Vec::new(),
            allowed_mentions: None,
        }
    }

    /// Announcement for `item`, pinging `roles` ahead of the embed.
    pub fn news(item: &NewsItem, roles: &[RoleId]) -> Self {
        let mut content = "🔔 **Breaking News!**".to_string();
        for role in roles {
            content.push_str(&format!(" {}", role_mention(*role)));
        }

        let embed = Embed {
            title: item.title.chars().take(MAX_TITLE_CHARS).collect(),
            url: item.link.clone(),
            description: item.summary.clone(),
            color: category_color(item.category),
            image: item.image_url.clone().map(|url| EmbedImage { url }),
            footer: Some(EmbedFooter {
                text: format!("Source: {} | {}", item.category.label(), item.published),
            }),
        };

        Self {
            content,
            embeds: vec![embed],
            allowed_mentions: Some(AllowedMentions {
                parse: vec!["roles".to_string()],
            }),
        }
    }
}

pub fn role_mention(role: RoleId) -> String {
    format!("<@&{}>", role)
}

pub fn category_color(category: Category) -> u32 {
    match category {
        Category::Windows => WINDOWS_COLOR,
        Category::Linux => LINUX_COLOR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(category: Category, image_url: Option<&str>) -> NewsItem {
        NewsItem {
            id: "id-1".to_string(),
            title: "Kernel 6.9 released".to_string(),
            link: "https://example.com/kernel".to_string(),
            summary: "New scheduler.".to_string(),
            image_url: image_url.map(String::from),
            published: "Mon, 1 Jan 2024 00:00:00 +0000".to_string(),
            category,
        }
    }

    #[test]
    fn news_message_mentions_roles_and_colors_by_category() {
        let message = OutgoingMessage::news(
            &item(Category::Linux, Some("https://img/x.png")),
            &[RoleId(1), RoleId(2)],
        );

        assert_eq!(message.content, "🔔 **Breaking News!** <@&1> <@&2>");
        let embed = &message.embeds[0];
        assert_eq!(embed.color, LINUX_COLOR);
        assert_eq!(embed.url, "https://example.com/kernel");
        assert_eq!(embed.image.as_ref().unwrap().url, "https://img/x.png");
        assert_eq!(
            embed.footer.as_ref().unwrap().text,
            "Source: Linux | Mon, 1 Jan 2024 00:00:00 +0000"
        );
    }

    #[test]
    fn payload_omits_missing_parts() {
        let message = OutgoingMessage::news(&item(Category::Windows, None), &[]);
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["content"], "🔔 **Breaking News!**");
        assert_eq!(json["embeds"][0]["color"], WINDOWS_COLOR);
        assert!(json["embeds"][0].get("image").is_none());
        assert_eq!(json["allowed_mentions"]["parse"][0], "roles");

        let plain = serde_json::to_value(OutgoingMessage::text("hi")).unwrap();
        assert!(plain.get("embeds").is_none());
        assert!(plain.get("allowed_mentions").is_none());
    }
}
