#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use handson_gui::config::Settings;
use handson_gui::connection::{self, SerialApp};
use handson_gui::{logging, WINDOW_TITLE};
use iced::{window, Task};

pub fn main() -> iced::Result {
    logging::trace_init();
    let settings = Settings::load();

    iced::application(WINDOW_TITLE, SerialApp::update, SerialApp::view)
        .subscription(SerialApp::subscription)
        .window(window::Settings {
            size: connection::MIN_SIZE,
            min_size: Some(connection::MIN_SIZE),
            // The worker is killed before the window closes.
            exit_on_close_request: false,
            ..window::Settings::default()
        })
        .run_with(move || (SerialApp::new(settings.serial), Task::none()))
}
