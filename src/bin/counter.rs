#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use handson_gui::counter::{self, Counter};
use handson_gui::{logging, WINDOW_TITLE};
use iced::{window, Task};

pub fn main() -> iced::Result {
    logging::trace_init();

    iced::application(WINDOW_TITLE, Counter::update, Counter::view)
        .window(window::Settings {
            size: counter::MIN_SIZE,
            min_size: Some(counter::MIN_SIZE),
            ..window::Settings::default()
        })
        .run_with(|| (Counter::new(), Task::none()))
}
