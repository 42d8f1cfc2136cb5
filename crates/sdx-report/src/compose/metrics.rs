//! Helvetica font metrics, line wrapping and WinAnsi encoding.
//!
//! Widths are the Adobe AFM advance widths for the base-14 Helvetica and
//! Helvetica-Bold faces, in 1/1000 em. The PDF backend draws with the same
//! faces, so measured lines never overrun their boxes.

/// Printable ASCII 0x20..=0x7E.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    278, 278, 584, 584, 584, 556, 1015, // :;<=>?@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    278, 278, 278, 469, 556, 333, // [\]^_`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a-m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n-z
    334, 260, 334, 584, // {|}~
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    333, 333, 584, 584, 584, 611, 975, // :;<=>?@
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    333, 278, 333, 584, 556, 333, // [\]^_`
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // a-m
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // n-z
    389, 280, 389, 584, // {|}~
];

fn glyph_width(c: char, bold: bool) -> u16 {
    let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
    match c {
        ' '..='~' => table[c as usize - 0x20],
        '\u{2022}' => 350,
        '\u{2026}' | '\u{2014}' | '\u{2030}' => 1000,
        '\u{2013}' => 556,
        '\u{2018}' | '\u{2019}' | '\u{201A}' => {
            if bold {
                278
            } else {
                222
            }
        }
        '\u{201C}' | '\u{201D}' | '\u{201E}' => {
            if bold {
                500
            } else {
                333
            }
        }
        '\u{00A0}' => 278,
        _ => 556,
    }
}

/// Advance width of `text` in points.
pub fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let units: u32 = text.chars().map(|c| glyph_width(c, bold) as u32).sum();
    units as f32 * size / 1000.0
}

/// Greedy word wrap to `max_width` points.
///
/// Explicit newlines are kept as hard breaks. Words wider than a line are
/// broken between characters. Always returns at least one (possibly empty)
/// line.
pub fn wrap_text(text: &str, size: f32, bold: bool, max_width: f32) -> Vec<String> {
    let space = text_width(" ", size, bold);
    let mut lines = Vec::new();

    for raw in text.split('\n') {
        let mut line = String::new();
        let mut width = 0.0f32;

        for word in raw.split_whitespace() {
            let word_width = text_width(word, size, bold);

            if !line.is_empty() && width + space + word_width <= max_width {
                line.push(' ');
                line.push_str(word);
                width += space + word_width;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                width = 0.0;
            }
            if word_width <= max_width {
                line.push_str(word);
                width = word_width;
                continue;
            }
            for c in word.chars() {
                let w = glyph_width(c, bold) as f32 * size / 1000.0;
                if !line.is_empty() && width + w > max_width {
                    lines.push(std::mem::take(&mut line));
                    width = 0.0;
                }
                line.push(c);
                width += w;
            }
        }
        lines.push(line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Shorten `line` so that it plus an ellipsis fits in `max_width`.
pub fn truncate_with_ellipsis(line: &str, size: f32, bold: bool, max_width: f32) -> String {
    let ellipsis = text_width("\u{2026}", size, bold);
    let mut out = String::new();
    let mut width = 0.0f32;
    for c in line.chars() {
        let w = glyph_width(c, bold) as f32 * size / 1000.0;
        if width + w + ellipsis > max_width {
            break;
        }
        out.push(c);
        width += w;
    }
    out.push('\u{2026}');
    out
}

/// Encode text for a simple font with `/WinAnsiEncoding`.
///
/// Characters outside the code page become `?`.
pub fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7E}' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2030}' => 0x89,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\t' => b' ',
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_width() {
        // "Hi" = H(722) + i(222)
        assert!((text_width("Hi", 10.0, false) - 9.44).abs() < 1e-4);
        assert!(text_width("Hi", 10.0, true) > text_width("Hi", 10.0, false));
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "The backlog grew steadily through the quarter while resolution times held flat.";
        let lines = wrap_text(text, 10.0, false, 120.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, 10.0, false) <= 120.0, "line too wide: {}", line);
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_wrap_breaks_long_words() {
        let lines = wrap_text("INC0000000000000000000000000001", 10.0, false, 40.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), "INC0000000000000000000000000001");
    }

    #[test]
    fn test_wrap_hard_breaks_and_empty() {
        assert_eq!(wrap_text("a\nb", 10.0, false, 500.0), vec!["a", "b"]);
        assert_eq!(wrap_text("", 10.0, false, 500.0), vec![""]);
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        let out = truncate_with_ellipsis("Escalation rate by assignment group", 8.0, false, 50.0);
        assert!(out.ends_with('\u{2026}'));
        assert!(text_width(&out, 8.0, false) <= 50.0);
    }

    #[test]
    fn test_win_ansi() {
        assert_eq!(win_ansi("A\u{2014}\u{e9}\u{4e2d}"), vec![b'A', 0x97, 0xE9, b'?']);
    }
}
