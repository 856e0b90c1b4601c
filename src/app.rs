use crate::{
    clock::{Clock, Reading},
    config::Config,
    input::Command,
    sink::Sink,
    view::{View, ViewFormatter},
    weather::{WeatherSnapshot, WeatherSource},
};
use log::{error, info, trace, warn};
use std::{
    ops::ControlFlow,
    sync::mpsc::{Receiver, TryRecvError},
    thread,
    time::{Duration, Instant},
};

/// Everything the main loop needs. Built once in `main`, then consumed by
/// [App::run].
pub struct App {
    clock: Box<dyn Clock>,
    weather_source: Box<dyn WeatherSource>,
    formatter: ViewFormatter,
    terminal: Box<dyn Sink>,
    mirror: Option<Box<dyn Sink>>,
    commands: Receiver<Command>,
    weather_interval: Duration,
    tick_interval: Duration,

    // Logical state
    view: View,
    /// What's currently on screen. `None` forces a render on the next tick
    last_rendered: Option<Reading>,
    /// Latest successful fetch. Kept when a later fetch fails
    weather: Option<WeatherSnapshot>,
    /// Last fetch *attempt*, successful or not
    last_weather_update: Option<Instant>,
}

impl App {
    /// Used when the terminal can't tell us its size
    const DEFAULT_WIDTH: usize = 80;

    pub fn new(
        config: &Config,
        clock: Box<dyn Clock>,
        weather_source: Box<dyn WeatherSource>,
        terminal: Box<dyn Sink>,
        mirror: Option<Box<dyn Sink>>,
        commands: Receiver<Command>,
    ) -> Self {
        Self {
            clock,
            weather_source,
            formatter: ViewFormatter::new(config.language),
            terminal,
            mirror,
            commands,
            weather_interval: config.weather_interval(),
            tick_interval: config.tick_interval(),
            view: View::default(),
            last_rendered: None,
            weather: None,
            last_weather_update: None,
        }
    }

    /// Run until the user quits. Errors from the terminal are fatal, anything
    /// else is logged and survived.
    pub fn run(mut self) -> anyhow::Result<()> {
        info!("Starting display loop");
        while self.tick(Instant::now())?.is_continue() {
            thread::sleep(self.tick_interval);
        }
        info!("Program stopped by user");
        Ok(())
    }

    /// One iteration of the main loop: handle input, refresh weather if
    /// it's due, and redraw if the clock has moved on
    pub fn tick(&mut self, now: Instant) -> anyhow::Result<ControlFlow<()>> {
        if self.handle_commands().is_break() {
            return Ok(ControlFlow::Break(()));
        }

        let reading = self.clock.now();

        if self.weather_due(now) {
            self.refresh_weather();
            self.last_weather_update = Some(now);
        }

        // Only redraw when the text changes, to avoid pointless screen clears
        if self.last_rendered.as_ref() != Some(&reading) {
            self.render(&reading)?;
            self.last_rendered = Some(reading);
        }

        Ok(ControlFlow::Continue(()))
    }

    /// Drain all pending input
    fn handle_commands(&mut self) -> ControlFlow<()> {
        loop {
            match self.commands.try_recv() {
                Ok(Command::NextView) => self.view = self.view.next(),
                Ok(Command::PreviousView) => self.view = self.view.previous(),
                Ok(Command::Quit) => return ControlFlow::Break(()),
                // Disconnected means nobody can send input anymore, which
                // isn't a reason to stop the clock
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => {
                    return ControlFlow::Continue(())
                }
            }
        }
    }

    fn weather_due(&self, now: Instant) -> bool {
        match self.last_weather_update {
            None => true,
            Some(last) => now.saturating_duration_since(last)
                >= self.weather_interval,
        }
    }

    fn refresh_weather(&mut self) {
        match self.weather_source.fetch() {
            Ok(snapshot) => self.weather = Some(snapshot),
            Err(err) => {
                // Old is better than nothing
                error!("Error fetching weather, keeping last data: {err:?}")
            }
        }
    }

    fn render(&mut self, reading: &Reading) -> anyhow::Result<()> {
        let width = self.terminal.width().unwrap_or(Self::DEFAULT_WIDTH);
        trace!("Rendering {:?} at width {width}", self.view);
        let frame = self.formatter.render(
            self.view,
            reading,
            self.weather.as_ref(),
            width,
        );
        self.terminal.send(&frame)?;

        // A broken mirror is never fatal. There's no reconnect, but every
        // frame gets a fresh attempt
        if let Some(mirror) = &mut self.mirror {
            if let Err(err) = mirror.send(&frame) {
                warn!("Error sending frame to {}: {err:?}", mirror.name());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::{
        cell::RefCell,
        collections::VecDeque,
        rc::Rc,
        sync::mpsc::{self, Sender},
    };

    /// Clock that reads whatever the test last set
    #[derive(Clone, Default)]
    struct FakeClock(Rc<RefCell<Reading>>);

    impl FakeClock {
        fn set(&self, time: &str, date: &str) {
            *self.0.borrow_mut() = Reading {
                time: time.into(),
                date: date.into(),
            };
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Reading {
            self.0.borrow().clone()
        }
    }

    /// Hands out queued results, and counts calls
    #[derive(Clone, Default)]
    struct FakeWeather {
        results: Rc<RefCell<VecDeque<anyhow::Result<WeatherSnapshot>>>>,
        calls: Rc<RefCell<usize>>,
    }

    impl FakeWeather {
        fn push(&self, result: anyhow::Result<WeatherSnapshot>) {
            self.results.borrow_mut().push_back(result);
        }

        fn calls(&self) -> usize {
            *self.calls.borrow()
        }
    }

    impl WeatherSource for FakeWeather {
        fn fetch(&mut self) -> anyhow::Result<WeatherSnapshot> {
            *self.calls.borrow_mut() += 1;
            self.results
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("No more weather")))
        }
    }

    /// Records every frame it's sent
    #[derive(Clone, Default)]
    struct FakeSink {
        frames: Rc<RefCell<Vec<String>>>,
        broken: bool,
    }

    impl FakeSink {
        fn frames(&self) -> Vec<String> {
            self.frames.borrow().clone()
        }
    }

    impl Sink for FakeSink {
        fn name(&self) -> &str {
            "fake"
        }

        fn width(&self) -> Option<usize> {
            Some(40)
        }

        fn send(&mut self, frame: &str) -> anyhow::Result<()> {
            if self.broken {
                return Err(anyhow!("Unplugged"));
            }
            self.frames.borrow_mut().push(frame.to_owned());
            Ok(())
        }
    }

    struct Harness {
        app: App,
        clock: FakeClock,
        weather: FakeWeather,
        terminal: FakeSink,
        commands: Sender<Command>,
        start: Instant,
    }

    impl Harness {
        fn new(mirror: Option<FakeSink>) -> Self {
            let clock = FakeClock::default();
            clock.set("14:05:32", "27.05.2024");
            let weather = FakeWeather::default();
            let terminal = FakeSink::default();
            let (commands, receiver) = mpsc::channel();
            let app = App::new(
                &Config::default(),
                Box::new(clock.clone()),
                Box::new(weather.clone()),
                Box::new(terminal.clone()),
                mirror.map(|sink| Box::new(sink) as Box<dyn Sink>),
                receiver,
            );
            Self {
                app,
                clock,
                weather,
                terminal,
                commands,
                start: Instant::now(),
            }
        }

        /// Tick at some offset from the start of the test
        fn step_at(&mut self, seconds: u64) -> ControlFlow<()> {
            self.app
                .tick(self.start + Duration::from_secs(seconds))
                .unwrap()
        }

        /// Tick, expecting the loop to keep going
        fn tick_at(&mut self, seconds: u64) {
            assert!(self.step_at(seconds).is_continue());
        }

        fn expected_frame(&self, view: View) -> String {
            self.app.formatter.render(
                view,
                &self.clock.now(),
                self.app.weather.as_ref(),
                40,
            )
        }
    }

    fn snapshot(temp_min: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            temp_min,
            temp_max: 18.7,
            sunrise: "05:42".into(),
            sunset: "20:13".into(),
        }
    }

    #[test]
    fn test_render_only_on_change() {
        let mut harness = Harness::new(None);
        harness.tick_at(0);
        harness.tick_at(0);
        assert_eq!(harness.terminal.frames().len(), 1);

        harness.clock.set("14:05:33", "27.05.2024");
        harness.tick_at(1);
        assert_eq!(harness.terminal.frames().len(), 2);

        // Date change alone is enough
        harness.clock.set("14:05:33", "28.05.2024");
        harness.tick_at(1);
        assert_eq!(harness.terminal.frames().len(), 3);
    }

    #[test]
    fn test_weather_interval() {
        let mut harness = Harness::new(None);
        harness.weather.push(Ok(snapshot(10.2)));
        harness.tick_at(0);
        assert_eq!(harness.weather.calls(), 1);
        assert_eq!(harness.app.weather, Some(snapshot(10.2)));

        harness.tick_at(299);
        assert_eq!(harness.weather.calls(), 1);

        harness.weather.push(Ok(snapshot(11.0)));
        harness.tick_at(300);
        assert_eq!(harness.weather.calls(), 2);
        assert_eq!(harness.app.weather, Some(snapshot(11.0)));
    }

    #[test]
    fn test_failed_fetch_keeps_snapshot() {
        let mut harness = Harness::new(None);
        harness.weather.push(Ok(snapshot(10.2)));
        harness.tick_at(0);

        harness.weather.push(Err(anyhow!("Service unavailable")));
        harness.clock.set("14:10:32", "27.05.2024");
        harness.tick_at(300);
        assert_eq!(harness.weather.calls(), 2);
        assert_eq!(harness.app.weather, Some(snapshot(10.2)));
        assert_eq!(
            harness.terminal.frames().last(),
            Some(&harness.expected_frame(View::ClockWeather))
        );

        // Timer was reset even though the fetch failed
        harness.tick_at(301);
        assert_eq!(harness.weather.calls(), 2);
    }

    #[test]
    fn test_no_weather_yet() {
        let mut harness = Harness::new(None);
        harness.weather.push(Err(anyhow!("Offline")));
        harness.tick_at(0);
        assert_eq!(harness.app.weather, None);
        let frames = harness.terminal.frames();
        assert!(frames[0].contains("Weather data unavailable"));
    }

    #[test]
    fn test_navigation() {
        let mut harness = Harness::new(None);
        harness.commands.send(Command::PreviousView).unwrap();
        harness.tick_at(0);
        assert_eq!(harness.app.view, View::ClockOnly);
        assert_eq!(
            harness.terminal.frames()[0],
            harness.expected_frame(View::ClockOnly)
        );

        for _ in 0..3 {
            harness.commands.send(Command::NextView).unwrap();
        }
        harness.tick_at(0);
        assert_eq!(harness.app.view, View::ClockOnly);

        harness.commands.send(Command::NextView).unwrap();
        harness.tick_at(0);
        assert_eq!(harness.app.view, View::ClockWeather);
        // Same second, so the new view waits for the next redraw
        assert_eq!(harness.terminal.frames().len(), 1);
    }

    #[test]
    fn test_quit() {
        let mut harness = Harness::new(None);
        harness.tick_at(0);
        harness.commands.send(Command::Quit).unwrap();
        assert!(harness.step_at(0).is_break());
        // Quitting doesn't draw anything
        assert_eq!(harness.terminal.frames().len(), 1);
    }

    #[test]
    fn test_disconnected_input() {
        let mut harness = Harness::new(None);
        drop(harness.commands);
        assert!(harness.app.tick(harness.start).unwrap().is_continue());
    }

    #[test]
    fn test_mirror() {
        let mirror = FakeSink::default();
        let mut harness = Harness::new(Some(mirror.clone()));
        harness.tick_at(0);
        assert_eq!(mirror.frames(), harness.terminal.frames());
    }

    #[test]
    fn test_broken_mirror() {
        let mirror = FakeSink {
            broken: true,
            ..Default::default()
        };
        let mut harness = Harness::new(Some(mirror));
        harness.tick_at(0);
        harness.clock.set("14:05:33", "27.05.2024");
        harness.tick_at(1);
        assert_eq!(harness.terminal.frames().len(), 2);
    }
}
