#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use handson_gui::config::Settings;
use handson_gui::graph::{self, GraphApp};
use handson_gui::{logging, WINDOW_TITLE};
use iced::{window, Size, Task};

pub fn main() -> iced::Result {
    logging::trace_init();
    let settings = Settings::load();

    iced::application(WINDOW_TITLE, GraphApp::update, GraphApp::view)
        .subscription(GraphApp::subscription)
        .antialiasing(true)
        .window(window::Settings {
            size: Size::new(640.0, 480.0),
            min_size: Some(graph::MIN_SIZE),
            ..window::Settings::default()
        })
        .run_with(move || (GraphApp::new(settings.graph), Task::none()))
}
