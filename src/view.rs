//! Screen layouts. A view is first laid out as a list of [Block]s, which are
//! then expanded into glyphs and centered to the terminal width.

use crate::{
    clock::Reading,
    glyph::{self, Font},
    weather::WeatherSnapshot,
};
use serde::Deserialize;
use unicode_width::UnicodeWidthStr;

/// One of the fixed screen layouts. Views cycle in declaration order.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum View {
    #[default]
    ClockWeather,
    WeatherOnly,
    ClockOnly,
}

impl View {
    const ALL: &'static [Self] =
        &[Self::ClockWeather, Self::WeatherOnly, Self::ClockOnly];

    pub fn index(self) -> usize {
        match self {
            Self::ClockWeather => 0,
            Self::WeatherOnly => 1,
            Self::ClockOnly => 2,
        }
    }

    /// Get the view at an index, wrapping around past the end
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn previous(self) -> Self {
        Self::from_index(self.index() + Self::ALL.len() - 1)
    }
}

/// Language for all on-screen labels
#[derive(Copy, Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    English,
    German,
}

#[derive(Debug)]
struct Labels {
    title: &'static str,
    sunrise: &'static str,
    sunset: &'static str,
    unavailable: &'static str,
    hint: &'static str,
}

impl Language {
    fn labels(self) -> &'static Labels {
        match self {
            Self::English => &Labels {
                title: "Weather",
                sunrise: "Sunrise",
                sunset: "Sunset",
                unavailable: "Weather data unavailable",
                hint: "Use ← → arrow keys to change views, Q to quit",
            },
            Self::German => &Labels {
                title: "Wetter",
                sunrise: "Sonnenaufgang",
                sunset: "Sonnenuntergang",
                unavailable: "Wetterdaten nicht verfügbar",
                hint: "Benutze ← → Pfeiltasten zum Wechseln der Ansicht, \
                    Q zum Beenden",
            },
        }
    }
}

/// A piece of a view, before glyph expansion and centering
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    /// Text to be drawn as a glyph block
    Glyphs(String, Font),
    /// A single line of plain text
    Text(String),
    Blank,
}

/// Turns the current time and weather into screen contents
#[derive(Debug)]
pub struct ViewFormatter {
    labels: &'static Labels,
}

impl ViewFormatter {
    pub fn new(language: Language) -> Self {
        Self {
            labels: language.labels(),
        }
    }

    /// Usage hint, to be shown below the view on the local terminal
    pub fn hint(&self) -> &'static str {
        self.labels.hint
    }

    /// Render a view into a block of text, with every line centered to
    /// `width` columns
    pub fn render(
        &self,
        view: View,
        reading: &Reading,
        weather: Option<&WeatherSnapshot>,
        width: usize,
    ) -> String {
        self.lines(view, reading, weather, width)
            .iter()
            .map(|line| center(line, width))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Expand a view's blocks into lines, before centering. Large glyph
    /// blocks that don't fit in `width` are drawn in the small font instead.
    fn lines(
        &self,
        view: View,
        reading: &Reading,
        weather: Option<&WeatherSnapshot>,
        width: usize,
    ) -> Vec<String> {
        let mut lines = Vec::new();
        for block in self.layout(view, reading, weather) {
            match block {
                Block::Glyphs(text, font) => {
                    lines.extend(fit_glyphs(&text, font, width))
                }
                Block::Text(text) => lines.push(text),
                Block::Blank => lines.push(String::new()),
            }
        }
        lines
    }

    /// Decide what goes on screen for a view, without rendering it
    pub fn layout(
        &self,
        view: View,
        reading: &Reading,
        weather: Option<&WeatherSnapshot>,
    ) -> Vec<Block> {
        let labels = self.labels;
        let mut blocks = Vec::new();
        match view {
            View::ClockWeather => {
                blocks.push(Block::Glyphs(reading.time.clone(), Font::Large));
                blocks.push(Block::Blank);
                blocks.push(Block::Text(reading.date.clone()));
                match weather {
                    Some(weather) => {
                        blocks.push(Block::Glyphs(
                            weather.temperature_range(),
                            Font::Small,
                        ));
                        blocks.push(Block::Blank);
                        blocks.push(Block::Text(format!(
                            "{}: {} | {}: {}",
                            labels.sunrise,
                            weather.sunrise,
                            labels.sunset,
                            weather.sunset
                        )));
                    }
                    None => self.push_unavailable(&mut blocks),
                }
            }
            View::WeatherOnly => {
                blocks.push(Block::Glyphs(labels.title.into(), Font::Large));
                match weather {
                    Some(weather) => {
                        blocks.push(Block::Glyphs(
                            weather.temperature_range(),
                            Font::Large,
                        ));
                        blocks.push(Block::Blank);
                        blocks.push(Block::Glyphs(
                            format!("{}: {}", labels.sunrise, weather.sunrise),
                            Font::Small,
                        ));
                        blocks.push(Block::Blank);
                        blocks.push(Block::Glyphs(
                            format!("{}: {}", labels.sunset, weather.sunset),
                            Font::Small,
                        ));
                    }
                    None => self.push_unavailable(&mut blocks),
                }
            }
            View::ClockOnly => {
                blocks.push(Block::Glyphs(reading.time.clone(), Font::Large));
                blocks.push(Block::Glyphs(reading.date.clone(), Font::Small));
            }
        }
        blocks
    }

    fn push_unavailable(&self, blocks: &mut Vec<Block>) {
        blocks.push(Block::Blank);
        blocks.push(Block::Text(self.labels.unavailable.into()));
    }
}

fn fit_glyphs(text: &str, font: Font, width: usize) -> Vec<String> {
    let lines = glyph::render(text, font);
    let too_wide = lines.iter().any(|line| line.width() > width);
    if font == Font::Large && too_wide {
        glyph::render(text, Font::Small)
    } else {
        lines
    }
}

/// Pad a line with spaces on both sides to fill `width` columns. Lines that
/// are already too wide are returned as-is. When the padding can't be split
/// evenly, the extra space goes on the right, unless the width is odd too.
pub fn center(line: &str, width: usize) -> String {
    let line_width = line.width();
    if line_width >= width {
        return line.to_owned();
    }
    let margin = width - line_width;
    let left = margin / 2 + (margin & width & 1);
    let right = margin - left;
    format!("{}{line}{}", " ".repeat(left), " ".repeat(right))
}
