//! Jumbo text. Every character is defined once as a 5-pixel-tall bitmap, and
//! each [Font] decides how a pixel maps onto terminal cells.

/// Height of a glyph bitmap, in pixels
const HEIGHT: usize = 5;

// Cells used to draw pixels
const FULL: char = '█';
const UPPER: char = '▀';
const LOWER: char = '▄';
const EMPTY: char = ' ';

type Glyph = [&'static str; HEIGHT];

/// Size of a rendered glyph block
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Font {
    /// Two pixels per cell, stacked vertically with half-block characters.
    /// Blocks are 3 lines tall.
    Small,
    /// Each pixel is two full-block cells wide. Blocks are 5 lines tall.
    Large,
}

/// Render a string as a multi-line glyph block. Every line in the block has
/// the same width. Lowercase letters are drawn as uppercase, and characters
/// without a glyph are drawn as `?`.
pub fn render(text: &str, font: Font) -> Vec<String> {
    // Lay out the whole string as one big bitmap first, with a blank column
    // between characters
    let mut pixels: [Vec<bool>; HEIGHT] = Default::default();
    for (i, character) in text.chars().enumerate() {
        let glyph = get_glyph(character);
        for (row, glyph_row) in pixels.iter_mut().zip(glyph) {
            if i > 0 {
                row.push(false);
            }
            row.extend(glyph_row.bytes().map(|byte| byte == b'#'));
        }
    }

    match font {
        Font::Large => pixels
            .iter()
            .map(|row| {
                row.iter()
                    .flat_map(|&on| {
                        let cell = if on { FULL } else { EMPTY };
                        [cell, cell]
                    })
                    .collect()
            })
            .collect(),
        Font::Small => pixels
            .chunks(2)
            .map(|rows| {
                let top = &rows[0];
                let bottom = rows.get(1);
                top.iter()
                    .enumerate()
                    .map(|(x, &upper)| {
                        let lower = bottom.is_some_and(|row| row[x]);
                        match (upper, lower) {
                            (true, true) => FULL,
                            (true, false) => UPPER,
                            (false, true) => LOWER,
                            (false, false) => EMPTY,
                        }
                    })
                    .collect()
            })
            .collect(),
    }
}

/// Get the bitmap for a single character. Each glyph is exactly [HEIGHT]
/// rows tall, but they have varying widths.
fn get_glyph(character: char) -> Glyph {
    match character.to_ascii_uppercase() {
        '0' => ["###", "# #", "# #", "# #", "###"],
        '1' => [" # ", "## ", " # ", " # ", "###"],
        '2' => ["###", "  #", "###", "#  ", "###"],
        '3' => ["###", "  #", " ##", "  #", "###"],
        '4' => ["# #", "# #", "###", "  #", "  #"],
        '5' => ["###", "#  ", "###", "  #", "###"],
        '6' => ["###", "#  ", "###", "# #", "###"],
        '7' => ["###", "  #", "  #", "  #", "  #"],
        '8' => ["###", "# #", "###", "# #", "###"],
        '9' => ["###", "# #", "###", "  #", "###"],
        'A' => [" # ", "# #", "###", "# #", "# #"],
        'B' => ["## ", "# #", "## ", "# #", "## "],
        'C' => [" ##", "#  ", "#  ", "#  ", " ##"],
        'D' => ["## ", "# #", "# #", "# #", "## "],
        'E' => ["###", "#  ", "## ", "#  ", "###"],
        'F' => ["###", "#  ", "## ", "#  ", "#  "],
        'G' => [" ##", "#  ", "# #", "# #", " ##"],
        'H' => ["# #", "# #", "###", "# #", "# #"],
        'I' => ["###", " # ", " # ", " # ", "###"],
        'J' => ["  #", "  #", "  #", "# #", " # "],
        'K' => ["# #", "# #", "## ", "# #", "# #"],
        'L' => ["#  ", "#  ", "#  ", "#  ", "###"],
        'M' => ["#   #", "## ##", "# # #", "#   #", "#   #"],
        'N' => ["#  #", "## #", "# ##", "#  #", "#  #"],
        'O' => [" # ", "# #", "# #", "# #", " # "],
        'P' => ["## ", "# #", "## ", "#  ", "#  "],
        'Q' => [" # ", "# #", "# #", "# #", " ##"],
        'R' => ["## ", "# #", "## ", "# #", "# #"],
        'S' => [" ##", "#  ", " # ", "  #", "## "],
        'T' => ["###", " # ", " # ", " # ", " # "],
        'U' => ["# #", "# #", "# #", "# #", "###"],
        'V' => ["# #", "# #", "# #", "# #", " # "],
        'W' => ["#   #", "#   #", "# # #", "## ##", "#   #"],
        'X' => ["# #", "# #", " # ", "# #", "# #"],
        'Y' => ["# #", "# #", " # ", " # ", " # "],
        'Z' => ["###", "  #", " # ", "#  ", "###"],
        ' ' => ["  ", "  ", "  ", "  ", "  "],
        ':' => [" ", "#", " ", "#", " "],
        '.' => [" ", " ", " ", " ", "#"],
        ',' => ["  ", "  ", "  ", " #", "# "],
        '-' => ["   ", "   ", "###", "   ", "   "],
        '+' => ["   ", " # ", "###", " # ", "   "],
        '/' => ["  #", "  #", " # ", "#  ", "#  "],
        '|' => ["#", "#", "#", "#", "#"],
        '°' => ["##", "##", "  ", "  ", "  "],
        _ => ["###", "  #", " ##", "   ", " # "],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_large_text() {
        assert_eq!(
            render("1:0", Font::Large),
            vec![
                "  ██        ██████",
                "████    ██  ██  ██",
                "  ██        ██  ██",
                "  ██    ██  ██  ██",
                "██████      ██████",
            ]
        );
    }

    #[test]
    fn test_small_text() {
        assert_eq!(
            render("1:0", Font::Small),
            vec![
                "▄█  ▄ █▀█",
                " █  ▄ █ █",
                "▀▀▀   ▀▀▀",
            ]
        );
    }

    #[test]
    fn test_lowercase_and_unknown() {
        assert_eq!(
            render("wetter", Font::Small),
            render("WETTER", Font::Small)
        );
        assert_eq!(render("~", Font::Large), render("?", Font::Large));
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(render("", Font::Small), vec!["", "", ""]);
        assert_eq!(render("", Font::Large).len(), HEIGHT);
    }

    /// Every row of a glyph needs the same width, otherwise lines in a
    /// rendered block won't line up
    #[test]
    fn test_glyph_rows_aligned() {
        let characters = ('A'..='Z')
            .chain('0'..='9')
            .chain(" :.,-+/|°?".chars());
        for character in characters {
            let glyph = get_glyph(character);
            let width = glyph[0].len();
            assert!(
                glyph.iter().all(|row| row.len() == width),
                "Glyph for {character:?} has ragged rows: {glyph:?}"
            );
        }
    }

    #[test]
    fn test_block_lines_same_width() {
        for font in [Font::Small, Font::Large] {
            let lines = render("Sunrise: 05:42", font);
            let width = lines[0].chars().count();
            assert!(lines.iter().all(|line| line.chars().count() == width));
        }
    }
}
