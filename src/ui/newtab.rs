/// The new tab page

use std::rc::Rc;

use gloo::timers::callback::Interval;
use log::warn;
use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

use super::components::{GroupSection, HistoryCard, ToastHost};
use crate::clock::{self, GREETING_REFRESH_MS, TIME_REFRESH_MS};
use crate::search::{self, SEARCH_ENGINES, SearchTarget};
use crate::settings::{Settings, TimeFormat, WallpaperMode};
use crate::storage::RecordStore;
use crate::tag_groups::{GroupDraft, TagGroupConfig};
use crate::toast::{ToastKind, ToastQueue};
use crate::wallpaper::{HistoricalWallpaper, WallpaperOptions, WallpaperService};
use crate::web::{self, BrowserFile};

enum ToastAction {
    Show(ToastKind, String),
    Close(u32),
    Expire,
}

#[derive(Default, PartialEq)]
struct Toasts(ToastQueue);

impl Reducible for Toasts {
    type Action = ToastAction;

    fn reduce(self: Rc<Self>, action: ToastAction) -> Rc<Self> {
        let mut queue = self.0.clone();
        match action {
            ToastAction::Show(kind, message) => {
                queue.push(message, kind, web::now_ms(), crate::toast::DEFAULT_DURATION_MS);
            }
            ToastAction::Close(id) => {
                if !queue.remove(id) {
                    return self;
                }
            }
            ToastAction::Expire => {
                queue.expire(web::now_ms());
                if queue == self.0 {
                    return self;
                }
            }
        }
        Rc::new(Toasts(queue))
    }
}

#[function_component(App)]
pub fn app() -> Html {
    let platform = use_memo((), |_| web::platform());
    let wallpaper = use_memo((), {
        let platform = (*platform).clone();
        move |_| WallpaperService::new(platform, WallpaperOptions::default())
    });
    let settings_records = use_memo((), {
        let platform = (*platform).clone();
        move |_| RecordStore::<Settings>::new(platform.store, platform.runtime)
    });
    let tag_records = use_memo((), {
        let platform = (*platform).clone();
        move |_| RecordStore::<TagGroupConfig>::new(platform.store, platform.runtime)
    });

    let background = use_state(String::new);
    let settings = use_state(Settings::default);
    let tag_groups = use_state(TagGroupConfig::default);
    let toasts = use_reducer(Toasts::default);
    let now = use_state(|| platform.runtime.now());
    let greeting = use_state(|| clock::greeting_at(platform.runtime.now()));
    let query = use_state(String::new);
    let new_group = use_state(String::new);
    let show_wallpaper_panel = use_state(|| false);
    let redraw = use_force_update();

    // Wallpaper: follow the background, start the pipeline, stop it on unmount
    {
        let wallpaper = wallpaper.clone();
        let background = background.setter();
        let redraw = redraw.clone();
        use_effect_with((), move |_| {
            wallpaper.on_display(move |url| {
                background.set(url.to_string());
                redraw.force_update();
            });
            wallpaper.watch_external_changes();
            let service = (*wallpaper).clone();
            spawn_local(async move { service.start().await });
            move || wallpaper.teardown()
        });
    }

    // Settings and tag groups, kept in sync with other tabs
    {
        let settings = settings.clone();
        let tag_groups = tag_groups.clone();
        let settings_records = settings_records.clone();
        let tag_records = tag_records.clone();
        use_effect_with((), move |_| {
            let settings_setter = settings.setter();
            settings_records.watch(move |changed| settings_setter.set(changed));
            let groups_setter = tag_groups.setter();
            tag_records.watch(move |changed| groups_setter.set(changed));

            spawn_local(async move {
                settings.set(settings_records.load().await);
                tag_groups.set(tag_records.load().await);
            });
            || ()
        });
    }

    // Clock, greeting and toast expiry
    {
        let now = now.setter();
        let greeting = greeting.setter();
        let toasts = toasts.dispatcher();
        let runtime = Rc::clone(&platform.runtime);
        use_effect_with((), move |_| {
            let time_runtime = Rc::clone(&runtime);
            let time = Interval::new(TIME_REFRESH_MS, move || {
                now.set(time_runtime.now());
                toasts.dispatch(ToastAction::Expire);
            });
            let greet = Interval::new(GREETING_REFRESH_MS, move || {
                greeting.set(clock::greeting_at(runtime.now()));
            });
            move || {
                drop(time);
                drop(greet);
            }
        });
    }

    let notify_error = {
        let toasts = toasts.dispatcher();
        Callback::from(move |message: String| toasts.dispatch(ToastAction::Show(ToastKind::Error, message)))
    };

    let notify_success = {
        let toasts = toasts.dispatcher();
        Callback::from(move |message: String| toasts.dispatch(ToastAction::Show(ToastKind::Success, message)))
    };

    let on_close_toast = {
        let toasts = toasts.dispatcher();
        Callback::from(move |id: u32| toasts.dispatch(ToastAction::Close(id)))
    };

    // Search
    let on_query_input = {
        let query = query.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                query.set(input.value());
            }
        })
    };

    let on_search = {
        let query = query.clone();
        let settings = settings.clone();
        Callback::from(move |e: KeyboardEvent| {
            if e.key() != "Enter" {
                return;
            }
            match search::resolve(&query, &settings.search_engine) {
                Some(SearchTarget::Navigate(url)) => web::navigate(&url),
                Some(SearchTarget::BrowserSearch(text)) => {
                    spawn_local(async move { web::browser_search(&text).await });
                }
                None => {}
            }
        })
    };

    let save_settings = {
        let settings = settings.clone();
        let settings_records = settings_records.clone();
        let notify_error = notify_error.clone();
        Callback::from(move |changed: Settings| {
            settings.set(changed.clone());
            let records = Rc::clone(&settings_records);
            let notify_error = notify_error.clone();
            spawn_local(async move {
                if !records.save(&changed).await {
                    notify_error.emit("Failed to save settings".to_string());
                }
            });
        })
    };

    let on_engine_change = {
        let settings = settings.clone();
        let save_settings = save_settings.clone();
        Callback::from(move |e: Event| {
            if let Some(select) = e.target_dyn_into::<HtmlSelectElement>() {
                let mut changed = (*settings).clone();
                changed.search_engine = select.value();
                save_settings.emit(changed);
            }
        })
    };

    let on_toggle_time_format = {
        let settings = settings.clone();
        let save_settings = save_settings.clone();
        Callback::from(move |_: MouseEvent| {
            let mut changed = (*settings).clone();
            changed.time_format = match changed.time_format {
                TimeFormat::TwelveHour => TimeFormat::TwentyFourHour,
                TimeFormat::TwentyFourHour => TimeFormat::TwelveHour,
            };
            save_settings.emit(changed);
        })
    };

    let on_toggle_seconds = {
        let settings = settings.clone();
        let save_settings = save_settings.clone();
        Callback::from(move |_: MouseEvent| {
            let mut changed = (*settings).clone();
            changed.show_seconds = !changed.show_seconds;
            save_settings.emit(changed);
        })
    };

    // Tag groups
    let save_groups = {
        let tag_groups = tag_groups.clone();
        let tag_records = tag_records.clone();
        let platform = platform.clone();
        let notify_error = notify_error.clone();
        let notify_success = notify_success.clone();
        Callback::from(move |(mut changed, notice): (TagGroupConfig, String)| {
            changed.touch(platform.runtime.now());
            tag_groups.set(changed.clone());
            let records = Rc::clone(&tag_records);
            let notify_error = notify_error.clone();
            let notify_success = notify_success.clone();
            spawn_local(async move {
                if records.save(&changed).await {
                    notify_success.emit(notice);
                } else {
                    notify_error.emit("Failed to save tag groups".to_string());
                }
            });
        })
    };

    let on_remove_tag = {
        let tag_groups = tag_groups.clone();
        let save_groups = save_groups.clone();
        let notify_error = notify_error.clone();
        Callback::from(move |(group_id, tag_id): (String, String)| {
            let mut changed = (*tag_groups).clone();
            match changed.remove_tag(&group_id, &tag_id) {
                Ok(tag) => save_groups.emit((changed, format!("Removed {}", tag.name))),
                Err(e) => notify_error.emit(e.to_string()),
            }
        })
    };

    let on_new_group_input = {
        let new_group = new_group.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                new_group.set(input.value());
            }
        })
    };

    let on_add_group = {
        let tag_groups = tag_groups.clone();
        let new_group = new_group.clone();
        let save_groups = save_groups.clone();
        let notify_error = notify_error.clone();
        Callback::from(move |_: MouseEvent| {
            let mut changed = (*tag_groups).clone();
            let draft = GroupDraft {
                name: (*new_group).clone(),
                ..GroupDraft::default()
            };
            match changed.add_group(draft) {
                Ok(group) => {
                    new_group.set(String::new());
                    save_groups.emit((changed, format!("Added group {}", group.name)));
                }
                Err(e) => notify_error.emit(e.to_string()),
            }
        })
    };

    let on_reset_groups = {
        let tag_groups = tag_groups.clone();
        let save_groups = save_groups.clone();
        Callback::from(move |_: MouseEvent| {
            let mut changed = (*tag_groups).clone();
            changed.reset_to_default();
            save_groups.emit((changed, "Reset to default tag groups".to_string()));
        })
    };

    // Wallpaper controls
    let on_toggle_wallpaper_panel = {
        let show = show_wallpaper_panel.clone();
        Callback::from(move |_: MouseEvent| show.set(!*show))
    };

    let on_mode = {
        let wallpaper = wallpaper.clone();
        let redraw = redraw.clone();
        move |mode: WallpaperMode| {
            let wallpaper = (*wallpaper).clone();
            let redraw = redraw.clone();
            Callback::from(move |_: MouseEvent| {
                let wallpaper = wallpaper.clone();
                let redraw = redraw.clone();
                spawn_local(async move {
                    wallpaper.set_mode(mode).await;
                    redraw.force_update();
                });
            })
        }
    };

    let on_upload = {
        let wallpaper = wallpaper.clone();
        let notify_error = notify_error.clone();
        let notify_success = notify_success.clone();
        Callback::from(move |e: Event| {
            let Some(file) = e
                .target_dyn_into::<HtmlInputElement>()
                .and_then(|input| input.files())
                .and_then(|files| files.get(0))
            else {
                return;
            };
            let wallpaper = (*wallpaper).clone();
            let notify_error = notify_error.clone();
            let notify_success = notify_success.clone();
            spawn_local(async move {
                match wallpaper.upload_local(&BrowserFile::from(file)).await {
                    Ok(()) => notify_success.emit("Wallpaper updated".to_string()),
                    Err(e) => {
                        warn!("upload failed: {e}");
                        notify_error.emit(e.to_string());
                    }
                }
            });
        })
    };

    let on_select_history = {
        let wallpaper = wallpaper.clone();
        let notify_error = notify_error.clone();
        let redraw = redraw.clone();
        Callback::from(move |entry: HistoricalWallpaper| {
            let wallpaper = (*wallpaper).clone();
            let notify_error = notify_error.clone();
            let redraw = redraw.clone();
            spawn_local(async move {
                if let Err(e) = wallpaper.select_fixed(&entry).await {
                    notify_error.emit(e.to_string());
                }
                redraw.force_update();
            });
        })
    };

    let on_load_more = {
        let wallpaper = wallpaper.clone();
        let redraw = redraw.clone();
        Callback::from(move |_: MouseEvent| {
            wallpaper.load_more_history();
            redraw.force_update();
        })
    };

    let mode = wallpaper.mode();
    let fixed_date = wallpaper.settings().fixed_date;
    let mode_button = |label: &'static str, target: WallpaperMode| {
        let variant = if mode == target { ButtonVariant::Primary } else { ButtonVariant::Secondary };
        html! {
            <Button onclick={on_mode(target)} {variant}>{label}</Button>
        }
    };

    let background_style = if background.is_empty() {
        String::new()
    } else {
        format!("background-image: url(\"{}\");", *background)
    };

    html! {
        <div class="newtab" style={background_style}>
            <header class="newtab-header">
                if settings.show_time {
                    <div class="time">{clock::time_text(*now, settings.time_format, settings.show_seconds)}</div>
                }
                if settings.show_date {
                    <div class="date">{clock::date_text(*now)}</div>
                }
                <div class="greeting">{*greeting}</div>
            </header>

            if settings.show_search {
                <div class="search-bar">
                    <input
                        type="text"
                        class="search-input"
                        placeholder="Search or enter address"
                        value={(*query).clone()}
                        oninput={on_query_input}
                        onkeydown={on_search}
                    />
                    <select class="search-engine" onchange={on_engine_change}>
                        {for SEARCH_ENGINES.iter().map(|engine| html! {
                            <option value={engine.id} selected={engine.id == search::engine(&settings.search_engine).id}>
                                {format!("{} {}", engine.fallback_icon, engine.name)}
                            </option>
                        })}
                    </select>
                </div>
            }

            if settings.show_bookmarks {
                <main class="tag-groups" style={format!("max-width: {}px;", settings.display_width)}>
                    {for tag_groups.groups.iter().map(|group| html! {
                        <GroupSection
                            key={group.id.clone()}
                            group={group.clone()}
                            columns={settings.columns_per_row}
                            on_remove_tag={on_remove_tag.clone()}
                        />
                    })}
                    <div class="group-actions">
                        <input
                            type="text"
                            placeholder="New group name"
                            value={(*new_group).clone()}
                            oninput={on_new_group_input}
                        />
                        <Button onclick={on_add_group} variant={ButtonVariant::Secondary}>{"Add group"}</Button>
                        <Button onclick={on_reset_groups} variant={ButtonVariant::Danger}>{"Reset"}</Button>
                    </div>
                </main>
            }

            <footer class="newtab-footer">
                <Button onclick={on_toggle_time_format} variant={ButtonVariant::Secondary}>
                    {if settings.time_format == TimeFormat::TwelveHour { "24h" } else { "12h" }}
                </Button>
                <Button onclick={on_toggle_seconds} variant={ButtonVariant::Secondary}>
                    {if settings.show_seconds { "Hide seconds" } else { "Show seconds" }}
                </Button>
                <Button onclick={on_toggle_wallpaper_panel} variant={ButtonVariant::Secondary}>
                    {"🖼️ Wallpaper"}
                </Button>
                if wallpaper.is_loading() {
                    <Spinner />
                }
            </footer>

            if *show_wallpaper_panel {
                <aside class="wallpaper-panel">
                    <div class="wallpaper-modes">
                        {mode_button("Daily", WallpaperMode::Daily)}
                        {mode_button("History", WallpaperMode::Fixed)}
                        {mode_button("Upload", WallpaperMode::Local)}
                    </div>
                    {match mode {
                        WallpaperMode::Daily => html! {
                            <p class="wallpaper-note">{"A new image every day."}</p>
                        },
                        WallpaperMode::Fixed => html! {
                            <div class="history">
                                <div class="history-grid">
                                    {for wallpaper.history().into_iter().map(|entry| {
                                        let selected = entry.date == fixed_date;
                                        let key = entry.date.clone();
                                        html! {
                                            <HistoryCard
                                                key={key}
                                                {selected}
                                                {entry}
                                                on_select={on_select_history.clone()}
                                            />
                                        }
                                    })}
                                </div>
                                <Button onclick={on_load_more} variant={ButtonVariant::Secondary} block={true}>
                                    {"Load more"}
                                </Button>
                            </div>
                        },
                        WallpaperMode::Local => html! {
                            <input type="file" accept="image/*" onchange={on_upload} />
                        },
                    }}
                </aside>
            }

            <ToastHost toasts={toasts.0.toasts().to_vec()} on_close={on_close_toast} />
        </div>
    }
}

