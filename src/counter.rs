//! `+1` / `-1` buttons driving a number shown in a label.

use iced::widget::{button, column, container, row, text};
use iced::{Element, Length, Size};
use rand::Rng;

pub const MIN_SIZE: Size = Size::new(300.0, 250.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    AddOne,
    RemoveOne,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    value: i64,
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

impl Counter {
    /// Starts from a random number in `0..100`.
    pub fn new() -> Self {
        let value = rand::thread_rng().gen_range(0..100);
        tracing::debug!(value, "Counter seeded.");
        Self::with_value(value)
    }

    pub fn with_value(value: i64) -> Self {
        Self { value }
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn label(&self) -> String {
        self.value.to_string()
    }

    pub fn update(&mut self, message: Message) {
        self.value = match message {
            Message::AddOne => self.value.saturating_add(1),
            Message::RemoveOne => self.value.saturating_sub(1),
        };
        tracing::trace!(?message, value = self.value);
    }

    pub fn view(&self) -> Element<'_, Message> {
        let buttons = row![
            button("+1")
                .on_press(Message::AddOne)
                .width(Length::Fill),
            button("-1")
                .on_press(Message::RemoveOne)
                .width(Length::Fill),
        ]
        .spacing(10);

        let display = container(text(self.label()).size(32))
            .center_x(Length::Fill)
            .center_y(Length::Fill);

        column![buttons, display].spacing(10).padding(20).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_seed_is_below_one_hundred() {
        for _ in 0..50 {
            let value = Counter::new().value();
            assert!((0..100).contains(&value), "seed {value} out of range");
        }
    }

    #[test]
    fn label_follows_clicks() {
        let mut counter = Counter::with_value(42);
        for _ in 0..5 {
            counter.update(Message::AddOne);
        }
        assert_eq!(counter.label(), "47");

        for _ in 0..50 {
            counter.update(Message::RemoveOne);
        }
        assert_eq!(counter.value(), -3);
        assert_eq!(counter.label(), "-3");
    }

    #[test]
    fn saturates_at_the_bounds() {
        let mut counter = Counter::with_value(i64::MAX);
        counter.update(Message::AddOne);
        assert_eq!(counter.value(), i64::MAX);

        let mut counter = Counter::with_value(i64::MIN);
        counter.update(Message::RemoveOne);
        assert_eq!(counter.value(), i64::MIN);
    }
}
