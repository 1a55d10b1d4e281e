/// Reusable pieces of the new tab page

use patternfly_yew::prelude::*;
use yew::prelude::*;

use crate::favicon::{favicon_sources, site_domain, tag_glyph};
use crate::tag_groups::{IconType, Tag, TagGroup};
use crate::toast::{Toast, ToastKind};
use crate::wallpaper::HistoricalWallpaper;

#[derive(Properties, PartialEq)]
pub struct ToastHostProps {
    pub toasts: Vec<Toast>,
    pub on_close: Callback<u32>,
}

#[function_component(ToastHost)]
pub fn toast_host(props: &ToastHostProps) -> Html {
    html! {
        <div class="toast-host">
            {for props.toasts.iter().map(|toast| {
                let kind = match toast.kind {
                    ToastKind::Log => AlertType::Info,
                    ToastKind::Warning => AlertType::Warning,
                    ToastKind::Error => AlertType::Danger,
                    ToastKind::Success => AlertType::Success,
                };
                let id = toast.id;
                html! {
                    <div key={id} class="toast" onclick={props.on_close.reform(move |_| id)}>
                        <Alert r#type={kind} title={toast.message.clone()} inline={true} />
                    </div>
                }
            })}
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct TagTileProps {
    pub tag: Tag,
    pub on_remove: Callback<String>,
}

#[function_component(TagTile)]
pub fn tag_tile(props: &TagTileProps) -> Html {
    let tag = &props.tag;
    let title = site_domain(&tag.url).unwrap_or_else(|| tag.url.clone());

    let icon = match tag.icon_type {
        IconType::Favicon => {
            let src = favicon_sources(&tag.url).primary;
            if src.is_empty() {
                html! { <span class="tag-glyph">{tag_glyph(tag)}</span> }
            } else {
                html! { <img class="tag-favicon" src={src} alt={tag.name.clone()} /> }
            }
        }
        IconType::Image | IconType::Svg => {
            html! { <img class="tag-image" src={tag.icon_value.clone()} alt={tag.name.clone()} /> }
        }
        IconType::Emoji | IconType::Text => html! { <span class="tag-glyph">{tag_glyph(tag)}</span> },
    };

    let on_remove = {
        let id = tag.id.clone();
        props.on_remove.reform(move |e: MouseEvent| {
            e.prevent_default();
            id.clone()
        })
    };

    html! {
        <a class="tag-tile" href={tag.url.clone()} title={title}>
            <div class="tag-icon" style={format!("background-color: {};", tag.background_color)}>
                {icon}
            </div>
            <span class="tag-name">{&tag.name}</span>
            <button class="tag-remove" onclick={on_remove}>{"×"}</button>
        </a>
    }
}

#[derive(Properties, PartialEq)]
pub struct GroupSectionProps {
    pub group: TagGroup,
    pub columns: u32,
    pub on_remove_tag: Callback<(String, String)>,
}

#[function_component(GroupSection)]
pub fn group_section(props: &GroupSectionProps) -> Html {
    let group = &props.group;
    let on_remove = {
        let group_id = group.id.clone();
        props
            .on_remove_tag
            .reform(move |tag_id: String| (group_id.clone(), tag_id))
    };

    html! {
        <section class="tag-group">
            <h2 class="tag-group-title" style={format!("border-color: {};", group.theme_color)}>
                {format!("{} {}", group.emoji, group.name)}
            </h2>
            <div class="tag-grid" style={format!("grid-template-columns: repeat({}, 1fr);", props.columns.max(1))}>
                {for group.tags.iter().map(|tag| html! {
                    <TagTile key={tag.id.clone()} tag={tag.clone()} on_remove={on_remove.clone()} />
                })}
            </div>
        </section>
    }
}

#[derive(Properties, PartialEq)]
pub struct HistoryCardProps {
    pub entry: HistoricalWallpaper,
    pub selected: bool,
    pub on_select: Callback<HistoricalWallpaper>,
}

#[function_component(HistoryCard)]
pub fn history_card(props: &HistoryCardProps) -> Html {
    let onclick = {
        let entry = props.entry.clone();
        props.on_select.reform(move |_| entry.clone())
    };
    let class = if props.selected { "history-card selected" } else { "history-card" };

    html! {
        <div class={class} {onclick}>
            <img src={props.entry.preview_url.clone()} alt={props.entry.display_date.clone()} loading="lazy" />
            <span class="history-date">{&props.entry.display_date}</span>
        </div>
    }
}
