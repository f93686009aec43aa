//! Temperature chart with `Clear`, `Draw` and `Add data` buttons, plus a
//! live mode that keeps appending readings on a timer.

use crate::config::GraphSettings;
use iced::alignment::{Horizontal, Vertical};
use iced::widget::canvas::{self, Cache, Canvas, Frame, Geometry, Path, Stroke, Text};
use iced::widget::{button, column, row};
use iced::time::{self, Instant};
use iced::{
    mouse, Color, Element, Length, Pixels, Point, Rectangle, Renderer, Size, Subscription, Theme,
};
use rand::Rng;

pub const MIN_SIZE: Size = Size::new(200.0, 160.0);

const TITLE: &str = "Temperature measurement";
const LEFT_LABEL: &str = "Temperature [°C]";
const BOTTOM_LABEL: &str = "Time [h]";

/// Reading appended by the `Add data` button.
const CANNED_TEMPERATURES: (f32, f32) = (41.0, 34.0);
/// Largest step of a live reading away from the previous one.
const MAX_DRIFT: f32 = 2.0;
const GRID_LINES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub hour: f32,
    pub temperature1: f32,
    pub temperature2: f32,
}

/// Three parallel series: time in hours and two temperatures.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureLog {
    hours: Vec<f32>,
    temperature1: Vec<f32>,
    temperature2: Vec<f32>,
}

impl Default for TemperatureLog {
    fn default() -> Self {
        Self {
            hours: (1..=10).map(|h| h as f32).collect(),
            temperature1: vec![30., 32., 34., 32., 33., 31., 29., 32., 35., 45.],
            temperature2: vec![16., 20., 17., 23., 30., 25., 28., 26., 22., 32.],
        }
    }
}

impl TemperatureLog {
    pub fn empty() -> Self {
        Self {
            hours: Vec::new(),
            temperature1: Vec::new(),
            temperature2: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.hours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    pub fn hours(&self) -> &[f32] {
        &self.hours
    }

    pub fn temperature1(&self) -> &[f32] {
        &self.temperature1
    }

    pub fn temperature2(&self) -> &[f32] {
        &self.temperature2
    }

    pub fn push(&mut self, reading: Reading) {
        self.hours.push(reading.hour);
        self.temperature1.push(reading.temperature1);
        self.temperature2.push(reading.temperature2);
    }

    pub fn next_hour(&self) -> f32 {
        self.hours.last().map_or(1.0, |hour| hour + 1.0)
    }

    /// The fixed reading appended by `Add data`.
    pub fn canned_reading(&self) -> Reading {
        let (temperature1, temperature2) = CANNED_TEMPERATURES;
        Reading {
            hour: self.next_hour(),
            temperature1,
            temperature2,
        }
    }

    /// A reading drifting at most [`MAX_DRIFT`] away from the last one.
    pub fn random_walk<R: Rng>(&self, rng: &mut R) -> Reading {
        let (base1, base2) = CANNED_TEMPERATURES;
        let last1 = self.temperature1.last().copied().unwrap_or(base1);
        let last2 = self.temperature2.last().copied().unwrap_or(base2);
        Reading {
            hour: self.next_hour(),
            temperature1: last1 + rng.gen_range(-MAX_DRIFT..=MAX_DRIFT),
            temperature2: last2 + rng.gen_range(-MAX_DRIFT..=MAX_DRIFT),
        }
    }

    /// `(hour, temperature)` pairs of the two curves.
    fn curves(&self) -> [Vec<(f32, f32)>; 2] {
        [
            self.hours
                .iter()
                .copied()
                .zip(self.temperature1.iter().copied())
                .collect(),
            self.hours
                .iter()
                .copied()
                .zip(self.temperature2.iter().copied())
                .collect(),
        ]
    }
}

/// Data extents, padded so no curve touches the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

impl Bounds {
    pub fn of(log: &TemperatureLog) -> Self {
        let (x_min, x_max) = extent(log.hours.iter());
        let (y_min, y_max) = extent(log.temperature1.iter().chain(log.temperature2.iter()));
        let (x_min, x_max) = pad(x_min, x_max, 0.0);
        let (y_min, y_max) = pad(y_min, y_max, 0.05);
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Maps a sample onto `area`, y growing upwards.
    pub fn project(&self, x: f32, y: f32, area: Rectangle) -> Point {
        let tx = (x - self.x_min) / (self.x_max - self.x_min);
        let ty = (y - self.y_min) / (self.y_max - self.y_min);
        Point::new(area.x + tx * area.width, area.y + area.height - ty * area.height)
    }
}

fn extent<'a>(values: impl Iterator<Item = &'a f32>) -> (f32, f32) {
    values.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)))
}

fn pad(lo: f32, hi: f32, ratio: f32) -> (f32, f32) {
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let span = hi - lo;
    if span <= f32::EPSILON {
        return (lo - 1.0, hi + 1.0);
    }
    (lo - span * ratio, hi + span * ratio)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Curve {
    pub name: &'static str,
    pub color: Color,
}

pub const CURVES: [Curve; 2] = [
    Curve {
        name: "Temp 1",
        color: Color {
            r: 1.0,
            g: 0.0,
            b: 0.0,
            a: 1.0,
        },
    },
    Curve {
        name: "Temp 2",
        color: Color {
            r: 0.0,
            g: 0.0,
            b: 1.0,
            a: 1.0,
        },
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Clear,
    Draw,
    AddData,
    ToggleLive,
    Tick(Instant),
}

pub struct GraphApp {
    log: TemperatureLog,
    drawn: bool,
    live: bool,
    settings: GraphSettings,
    cache: Cache,
}

impl GraphApp {
    pub fn new(settings: GraphSettings) -> Self {
        Self::with_log(TemperatureLog::default(), settings)
    }

    pub fn with_log(log: TemperatureLog, settings: GraphSettings) -> Self {
        Self {
            log,
            drawn: true,
            live: false,
            settings,
            cache: Cache::new(),
        }
    }

    pub fn log(&self) -> &TemperatureLog {
        &self.log
    }

    /// Whether the curves are on the chart.
    pub fn is_drawn(&self) -> bool {
        self.drawn
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn update(&mut self, message: Message) {
        match message {
            Message::Clear => {
                self.drawn = false;
            }
            Message::Draw => {
                self.drawn = true;
            }
            Message::AddData => {
                let reading = self.log.canned_reading();
                self.push(reading);
            }
            Message::ToggleLive => {
                self.live = !self.live;
                tracing::info!(live = self.live, "Live mode toggled.");
            }
            Message::Tick(_) => {
                if !self.live {
                    return;
                }
                let reading = self.log.random_walk(&mut rand::thread_rng());
                self.push(reading);
            }
        }
        self.cache.clear();
    }

    fn push(&mut self, reading: Reading) {
        tracing::debug!(?reading, "Appending reading.");
        self.log.push(reading);
    }

    pub fn view(&self) -> Element<'_, Message> {
        let live_label = if self.live { "Stop live" } else { "Live" };
        let buttons = row![
            button("Clear").on_press(Message::Clear).width(Length::Fill),
            button("Draw").on_press(Message::Draw).width(Length::Fill),
            button("Add data").on_press(Message::AddData).width(Length::Fill),
            button(live_label).on_press(Message::ToggleLive).width(Length::Fill),
        ]
        .spacing(5);

        let chart = Canvas::new(self).width(Length::Fill).height(Length::Fill);

        column![buttons, chart].spacing(10).padding(10).into()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        if self.live {
            time::every(self.settings.live_interval()).map(Message::Tick)
        } else {
            Subscription::none()
        }
    }

    fn draw_chart(&self, frame: &mut Frame) {
        let size = frame.size();
        frame.fill_rectangle(Point::ORIGIN, size, Color::WHITE);

        let area = Rectangle {
            x: 60.0,
            y: 40.0,
            width: (size.width - 80.0).max(1.0),
            height: (size.height - 90.0).max(1.0),
        };
        let bounds = Bounds::of(&self.log);

        for i in 0..=GRID_LINES {
            let t = i as f32 / GRID_LINES as f32;
            let x = area.x + t * area.width;
            let y = area.y + t * area.height;
            frame.stroke(
                &Path::line(Point::new(x, area.y), Point::new(x, area.y + area.height)),
                grid_stroke(),
            );
            frame.stroke(
                &Path::line(Point::new(area.x, y), Point::new(area.x + area.width, y)),
                grid_stroke(),
            );
            let hour = bounds.x_min + t * (bounds.x_max - bounds.x_min);
            let temperature = bounds.y_max - t * (bounds.y_max - bounds.y_min);
            frame.fill_text(label(
                format!("{hour:.0}"),
                Point::new(x, area.y + area.height + 4.0),
                12.0,
                Horizontal::Center,
                Vertical::Top,
            ));
            frame.fill_text(label(
                format!("{temperature:.0}"),
                Point::new(area.x - 6.0, y),
                12.0,
                Horizontal::Right,
                Vertical::Center,
            ));
        }

        frame.stroke(
            &Path::rectangle(Point::new(area.x, area.y), area.size()),
            Stroke::default().with_width(1.0).with_color(Color::BLACK),
        );

        frame.fill_text(label(
            TITLE,
            Point::new(size.width / 2.0, 10.0),
            16.0,
            Horizontal::Center,
            Vertical::Top,
        ));
        frame.fill_text(label(
            BOTTOM_LABEL,
            Point::new(area.x + area.width / 2.0, size.height - 8.0),
            15.0,
            Horizontal::Center,
            Vertical::Bottom,
        ));
        frame.fill_text(label(
            LEFT_LABEL,
            Point::new(8.0, area.y - 20.0),
            15.0,
            Horizontal::Left,
            Vertical::Top,
        ));

        if !self.drawn {
            return;
        }

        for (curve, points) in CURVES.iter().zip(self.log.curves()) {
            if points.len() < 2 {
                continue;
            }
            let path = Path::new(|builder| {
                let mut projected = points.iter().map(|&(x, y)| bounds.project(x, y, area));
                if let Some(first) = projected.next() {
                    builder.move_to(first);
                }
                for point in projected {
                    builder.line_to(point);
                }
            });
            frame.stroke(&path, Stroke::default().with_width(2.0).with_color(curve.color));
        }

        // Legend in the top right corner of the plot area.
        for (i, curve) in CURVES.iter().enumerate() {
            let y = area.y + 12.0 + i as f32 * 18.0;
            let x = area.x + area.width - 80.0;
            frame.stroke(
                &Path::line(Point::new(x, y), Point::new(x + 20.0, y)),
                Stroke::default().with_width(2.0).with_color(curve.color),
            );
            frame.fill_text(label(
                curve.name,
                Point::new(x + 26.0, y),
                12.0,
                Horizontal::Left,
                Vertical::Center,
            ));
        }
    }
}

fn grid_stroke() -> Stroke<'static> {
    Stroke::default()
        .with_width(1.0)
        .with_color(Color::from_rgb(0.85, 0.85, 0.85))
}

fn label(
    content: impl Into<String>,
    position: Point,
    size: f32,
    horizontal_alignment: Horizontal,
    vertical_alignment: Vertical,
) -> Text {
    Text {
        content: content.into(),
        position,
        color: Color::BLACK,
        size: Pixels(size),
        horizontal_alignment,
        vertical_alignment,
        ..Text::default()
    }
}

impl canvas::Program<Message> for GraphApp {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let chart = self.cache.draw(renderer, bounds.size(), |frame| self.draw_chart(frame));
        vec![chart]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn app() -> GraphApp {
        GraphApp::new(GraphSettings::default())
    }

    #[test]
    fn starts_drawn_with_the_sample_data() {
        let app = app();
        assert!(app.is_drawn());
        assert!(!app.is_live());
        assert_eq!(app.log().len(), 10);
        assert_eq!(app.log().hours().first(), Some(&1.0));
        assert_eq!(app.log().temperature1().last(), Some(&45.0));
        assert_eq!(app.log().temperature2().last(), Some(&32.0));
    }

    #[test]
    fn add_data_appends_to_every_series() {
        let mut app = app();
        app.update(Message::AddData);
        app.update(Message::AddData);

        let log = app.log();
        assert_eq!(log.len(), 12);
        assert_eq!(log.temperature1().len(), 12);
        assert_eq!(log.temperature2().len(), 12);
        assert_eq!(&log.hours()[10..], &[11.0, 12.0]);
        assert_eq!(&log.temperature1()[10..], &[41.0, 41.0]);
        assert_eq!(&log.temperature2()[10..], &[34.0, 34.0]);
    }

    #[test]
    fn clear_hides_curves_but_keeps_data() {
        let mut app = app();
        app.update(Message::Clear);
        assert!(!app.is_drawn());
        assert_eq!(app.log(), &TemperatureLog::default());

        app.update(Message::AddData);
        assert_eq!(app.log().len(), 11);
        assert!(!app.is_drawn());

        app.update(Message::Draw);
        app.update(Message::Draw);
        assert!(app.is_drawn());
    }

    #[test]
    fn ticks_only_count_while_live() {
        let mut app = app();
        app.update(Message::Tick(Instant::now()));
        assert_eq!(app.log().len(), 10);

        app.update(Message::ToggleLive);
        assert!(app.is_live());
        app.update(Message::Tick(Instant::now()));
        app.update(Message::Tick(Instant::now()));
        assert_eq!(app.log().len(), 12);
        assert_eq!(app.log().hours().last(), Some(&12.0));

        app.update(Message::ToggleLive);
        app.update(Message::Tick(Instant::now()));
        assert_eq!(app.log().len(), 12);
    }

    #[test]
    fn random_walk_stays_close_to_the_last_reading() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut log = TemperatureLog::default();
        for _ in 0..100 {
            let last1 = *log.temperature1().last().unwrap();
            let last2 = *log.temperature2().last().unwrap();
            let reading = log.random_walk(&mut rng);
            assert!((reading.temperature1 - last1).abs() <= MAX_DRIFT);
            assert!((reading.temperature2 - last2).abs() <= MAX_DRIFT);
            assert_eq!(reading.hour, log.next_hour());
            log.push(reading);
        }
    }

    #[test]
    fn empty_log_starts_at_hour_one() {
        let log = TemperatureLog::empty();
        assert!(log.is_empty());
        assert_eq!(log.canned_reading().hour, 1.0);
        assert_eq!(
            Bounds::of(&log),
            Bounds {
                x_min: 0.0,
                x_max: 1.0,
                y_min: 0.0,
                y_max: 1.0
            }
        );
    }

    #[test]
    fn bounds_cover_both_series() {
        let bounds = Bounds::of(&TemperatureLog::default());
        assert_eq!(bounds.x_min, 1.0);
        assert_eq!(bounds.x_max, 10.0);
        // 16..45, padded by 5% of the 29 degree span.
        assert!((bounds.y_min - 14.55).abs() < 1e-4);
        assert!((bounds.y_max - 46.45).abs() < 1e-4);
    }

    #[test]
    fn single_sample_gets_a_non_zero_span() {
        let mut log = TemperatureLog::empty();
        log.push(Reading {
            hour: 3.0,
            temperature1: 20.0,
            temperature2: 20.0,
        });
        let bounds = Bounds::of(&log);
        assert_eq!((bounds.x_min, bounds.x_max), (2.0, 4.0));
        assert_eq!((bounds.y_min, bounds.y_max), (19.0, 21.0));
    }

    #[test]
    fn projection_maps_corners() {
        let bounds = Bounds {
            x_min: 0.0,
            x_max: 10.0,
            y_min: 0.0,
            y_max: 100.0,
        };
        let area = Rectangle {
            x: 10.0,
            y: 20.0,
            width: 200.0,
            height: 100.0,
        };
        assert_eq!(bounds.project(0.0, 0.0, area), Point::new(10.0, 120.0));
        assert_eq!(bounds.project(10.0, 100.0, area), Point::new(210.0, 20.0));
        assert_eq!(bounds.project(5.0, 50.0, area), Point::new(110.0, 70.0));
    }
}
