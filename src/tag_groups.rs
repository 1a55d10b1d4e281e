/// Grouped bookmark tags and the edits the settings panel makes to them
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::TagGroupError;
use crate::storage::VersionedRecord;

pub const TAG_GROUPS_KEY: &str = "FRESH_TAB_TAG_GROUPS";

/// The group that always exists
pub const DEFAULT_GROUP_ID: &str = "default";

pub const DEFAULT_TAG_ICON: &str = "🔗";
pub const DEFAULT_TAG_BACKGROUND: &str = "#666";
const DEFAULT_GROUP_EMOJI: &str = "📁";
const DEFAULT_THEME_COLOR: &str = "#667eea";

/// Colors offered when creating a group
pub const THEME_COLORS: [&str; 18] = [
    "#667eea", "#764ba2", "#f093fb", "#f5576c", "#4facfe", "#00f2fe", "#43e97b", "#38f9d7",
    "#ffa726", "#ff7043", "#ab47bc", "#5c6bc0", "#26a69a", "#66bb6a", "#ffa726", "#ff8a65",
    "#8d6e63", "#78909c",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IconType {
    #[default]
    Emoji,
    Image,
    Svg,
    Text,
    Favicon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub url: String,
    pub icon_type: IconType,
    pub icon_value: String,
    pub background_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagGroup {
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub theme_color: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagGroupConfig {
    pub version: String,
    pub last_modified: String,
    pub groups: Vec<TagGroup>,
}

/// Fields for a new group
#[derive(Debug, Clone, Default)]
pub struct GroupDraft {
    pub id: Option<String>,
    pub name: String,
    pub emoji: String,
    pub theme_color: String,
}

/// Fields to change on a group; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct GroupPatch {
    pub name: Option<String>,
    pub emoji: Option<String>,
    pub theme_color: Option<String>,
}

/// Fields for a new tag
#[derive(Debug, Clone, Default)]
pub struct TagDraft {
    pub name: String,
    pub url: String,
    pub icon_type: Option<IconType>,
    pub icon_value: Option<String>,
    pub background_color: Option<String>,
}

/// Fields to change on a tag; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct TagPatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub icon_type: Option<IconType>,
    pub icon_value: Option<String>,
    pub background_color: Option<String>,
}

fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

fn checked_name(name: &str) -> Result<String, TagGroupError> {
    let name = name.trim();
    if name.is_empty() {
        Err(TagGroupError::EmptyName)
    } else {
        Ok(name.to_string())
    }
}

fn tag(id: &str, name: &str, url: &str, icon: &str, background: &str) -> Tag {
    Tag {
        id: id.to_string(),
        name: name.to_string(),
        url: url.to_string(),
        icon_type: IconType::Emoji,
        icon_value: icon.to_string(),
        background_color: background.to_string(),
    }
}

impl Default for TagGroupConfig {
    fn default() -> Self {
        TagGroupConfig {
            version: TagGroupConfig::VERSION.to_string(),
            last_modified: String::new(),
            groups: vec![
                TagGroup {
                    id: DEFAULT_GROUP_ID.to_string(),
                    name: "Common Sites".to_string(),
                    emoji: "🌟".to_string(),
                    theme_color: "#667eea".to_string(),
                    tags: vec![
                        tag("tag_1", "Google", "https://www.google.com", "🔍", "#4285f4"),
                        tag("tag_2", "GitHub", "https://github.com", "🐱", "#333"),
                        tag("tag_3", "Stack Overflow", "https://stackoverflow.com", "📚", "#f48024"),
                    ],
                },
                TagGroup {
                    id: "dev_tools".to_string(),
                    name: "Development".to_string(),
                    emoji: "💻".to_string(),
                    theme_color: "#38b2ac".to_string(),
                    tags: vec![
                        tag("tag_4", "VS Code", "https://code.visualstudio.com", "⚡", "#007acc"),
                        tag("tag_5", "npm", "https://www.npmjs.com", "📦", "#cb3837"),
                    ],
                },
            ],
        }
    }
}

/// A string field of a stored object, or `default` when missing or empty
fn text(object: &Map<String, Value>, key: &str, default: impl FnOnce() -> String) -> String {
    match object.get(key).and_then(Value::as_str) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => default(),
    }
}

fn repair_tag(value: &Value) -> Option<Tag> {
    let object = value.as_object()?;
    Some(Tag {
        id: text(object, "id", || new_id("tag")),
        name: text(object, "name", || "Unnamed Tag".to_string()),
        url: text(object, "url", String::new),
        icon_type: object
            .get("iconType")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default(),
        icon_value: text(object, "iconValue", || DEFAULT_TAG_ICON.to_string()),
        background_color: text(object, "backgroundColor", || DEFAULT_TAG_BACKGROUND.to_string()),
    })
}

fn repair_group(value: &Value) -> Option<TagGroup> {
    let object = value.as_object()?;
    let tags = object
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| tags.iter().filter_map(repair_tag).collect())
        .unwrap_or_default();

    Some(TagGroup {
        id: text(object, "id", || new_id("group")),
        name: text(object, "name", || "Unnamed Group".to_string()),
        emoji: text(object, "emoji", || DEFAULT_GROUP_EMOJI.to_string()),
        theme_color: text(object, "themeColor", || DEFAULT_THEME_COLOR.to_string()),
        tags,
    })
}

impl VersionedRecord for TagGroupConfig {
    const KEY: &'static str = TAG_GROUPS_KEY;
    const VERSION: &'static str = "1";

    /// Groups and tags are repaired one by one: missing fields get
    /// defaults, entries that are not objects are dropped. A record with no
    /// group list at all is replaced by the default groups.
    fn migrate(stored: Value) -> (Self, bool) {
        let Some(saved) = stored.as_object() else {
            return (Self::default(), true);
        };
        let Some(groups) = saved.get("groups").and_then(Value::as_array) else {
            return (Self::default(), true);
        };

        if saved.get("version").and_then(Value::as_str) == Some(Self::VERSION) {
            if let Ok(config) = serde_json::from_value(stored.clone()) {
                return (config, false);
            }
        }

        let config = TagGroupConfig {
            version: Self::VERSION.to_string(),
            last_modified: text(saved, "lastModified", String::new),
            groups: groups.iter().filter_map(repair_group).collect(),
        };
        (config, true)
    }
}

impl TagGroupConfig {
    /// Record the time of an edit, as saved in `lastModified`
    pub fn touch(&mut self, now: NaiveDateTime) {
        self.last_modified = now.format("%Y-%m-%dT%H:%M:%S%.3f").to_string();
    }

    pub fn group(&self, id: &str) -> Option<&TagGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    fn group_mut(&mut self, id: &str) -> Result<&mut TagGroup, TagGroupError> {
        self.groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| TagGroupError::GroupNotFound(id.to_string()))
    }

    pub fn tag_count(&self) -> usize {
        self.groups.iter().map(|g| g.tags.len()).sum()
    }

    pub fn add_group(&mut self, draft: GroupDraft) -> Result<TagGroup, TagGroupError> {
        let name = checked_name(&draft.name)?;
        let id = draft.id.unwrap_or_else(|| new_id("group"));
        if self.group(&id).is_some() {
            return Err(TagGroupError::DuplicateGroup(id));
        }

        let group = TagGroup {
            id,
            name,
            emoji: if draft.emoji.is_empty() { DEFAULT_GROUP_EMOJI.to_string() } else { draft.emoji },
            theme_color: if draft.theme_color.is_empty() {
                DEFAULT_THEME_COLOR.to_string()
            } else {
                draft.theme_color
            },
            tags: Vec::new(),
        };
        self.groups.push(group.clone());
        Ok(group)
    }

    pub fn update_group(&mut self, id: &str, patch: GroupPatch) -> Result<TagGroup, TagGroupError> {
        let name = patch.name.as_deref().map(checked_name).transpose()?;
        let group = self.group_mut(id)?;

        if let Some(name) = name {
            group.name = name;
        }
        if let Some(emoji) = patch.emoji {
            group.emoji = emoji;
        }
        if let Some(theme_color) = patch.theme_color {
            group.theme_color = theme_color;
        }
        Ok(group.clone())
    }

    pub fn remove_group(&mut self, id: &str) -> Result<TagGroup, TagGroupError> {
        if id == DEFAULT_GROUP_ID {
            return Err(TagGroupError::ProtectedGroup(id.to_string()));
        }
        let index = self
            .groups
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| TagGroupError::GroupNotFound(id.to_string()))?;
        Ok(self.groups.remove(index))
    }

    pub fn add_tag(&mut self, group_id: &str, draft: TagDraft) -> Result<Tag, TagGroupError> {
        let name = checked_name(&draft.name)?;
        let group = self.group_mut(group_id)?;

        let tag = Tag {
            id: new_id("tag"),
            name,
            url: draft.url.trim().to_string(),
            icon_type: draft.icon_type.unwrap_or_default(),
            icon_value: draft
                .icon_value
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_TAG_ICON.to_string()),
            background_color: draft
                .background_color
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_TAG_BACKGROUND.to_string()),
        };
        group.tags.push(tag.clone());
        Ok(tag)
    }

    pub fn update_tag(&mut self, group_id: &str, tag_id: &str, patch: TagPatch) -> Result<Tag, TagGroupError> {
        let name = patch.name.as_deref().map(checked_name).transpose()?;
        let group = self.group_mut(group_id)?;
        let tag = group
            .tags
            .iter_mut()
            .find(|t| t.id == tag_id)
            .ok_or_else(|| TagGroupError::TagNotFound {
                group: group_id.to_string(),
                tag: tag_id.to_string(),
            })?;

        if let Some(name) = name {
            tag.name = name;
        }
        if let Some(url) = patch.url {
            tag.url = url.trim().to_string();
        }
        if let Some(icon_type) = patch.icon_type {
            tag.icon_type = icon_type;
        }
        if let Some(icon_value) = patch.icon_value {
            tag.icon_value = icon_value;
        }
        if let Some(background_color) = patch.background_color {
            tag.background_color = background_color;
        }
        Ok(tag.clone())
    }

    pub fn remove_tag(&mut self, group_id: &str, tag_id: &str) -> Result<Tag, TagGroupError> {
        let group = self.group_mut(group_id)?;
        let index = group
            .tags
            .iter()
            .position(|t| t.id == tag_id)
            .ok_or_else(|| TagGroupError::TagNotFound {
                group: group_id.to_string(),
                tag: tag_id.to_string(),
            })?;
        Ok(group.tags.remove(index))
    }

    /// Throw away all edits and go back to the built-in groups
    pub fn reset_to_default(&mut self) {
        *self = TagGroupConfig::default();
    }
}
