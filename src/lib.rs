/// Fresh Tab - new tab page extension
/// Built with Rust + WASM + Yew

pub mod clock;
pub mod dates;
pub mod error;
pub mod favicon;
pub mod platform;
pub mod retry;
pub mod search;
pub mod settings;
pub mod storage;
pub mod tag_groups;
pub mod toast;
pub mod ui;
pub mod wallpaper;
pub mod web;

#[cfg(test)]
mod testing;

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Start the Yew app for the new tab page
#[wasm_bindgen]
pub fn start_newtab() {
    yew::Renderer::<ui::newtab::App>::new().render();
}
