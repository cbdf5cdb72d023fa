//! Tesseract TSV output grouped into text lines

#![cfg_attr(not(feature = "engine-leptess"), allow(dead_code))]

use crate::detection::{quad_from_box, Quad};

/// TSV `level` value of word rows
const WORD_LEVEL: u32 = 5;

/// Words of one Tesseract text line and their union box
#[derive(Debug, Clone, PartialEq)]
pub struct TsvLine {
    key: (u32, u32, u32, u32),
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    words: Vec<String>,
    confidences: Vec<f32>,
}

impl TsvLine {
    pub fn text(&self) -> String {
        self.words.join(" ")
    }

    /// Mean word confidence mapped from Tesseract's 0-100 scale to [0, 1]
    pub fn confidence(&self) -> f32 {
        if self.confidences.is_empty() {
            return 0.0;
        }
        let mean = self.confidences.iter().sum::<f32>() / self.confidences.len() as f32;
        (mean / 100.0).clamp(0.0, 1.0)
    }

    pub fn region(&self) -> Quad {
        quad_from_box(
            self.left as f32,
            self.top as f32,
            (self.right - self.left) as f32,
            (self.bottom - self.top) as f32,
        )
    }

    fn extend(&mut self, word: TsvWord) {
        self.left = self.left.min(word.left);
        self.top = self.top.min(word.top);
        self.right = self.right.max(word.left + word.width);
        self.bottom = self.bottom.max(word.top + word.height);
        self.words.push(word.text);
        self.confidences.push(word.conf);
    }
}

struct TsvWord {
    key: (u32, u32, u32, u32),
    left: i32,
    top: i32,
    width: i32,
    height: i32,
    conf: f32,
    text: String,
}

/// Group word rows into lines, keeping the order lines first appear in
///
/// Header, non-word and unrecognized (`conf < 0`) rows are skipped, as are
/// rows that fail to parse.
pub fn parse_lines(tsv: &str) -> Vec<TsvLine> {
    let mut lines: Vec<TsvLine> = Vec::new();

    for word in tsv.lines().filter_map(parse_word) {
        match lines.iter_mut().find(|line| line.key == word.key) {
            Some(line) => line.extend(word),
            None => lines.push(TsvLine {
                key: word.key,
                left: word.left,
                top: word.top,
                right: word.left + word.width,
                bottom: word.top + word.height,
                words: vec![word.text],
                confidences: vec![word.conf],
            }),
        }
    }

    lines
}

fn parse_word(row: &str) -> Option<TsvWord> {
    let fields: Vec<&str> = row.split('\t').collect();
    if fields.len() < 12 {
        return None;
    }

    let level: u32 = fields[0].parse().ok()?;
    if level != WORD_LEVEL {
        return None;
    }

    let conf: f32 = fields[10].parse().ok()?;
    let text = fields[11..].join("\t").trim().to_string();
    if conf < 0.0 || text.is_empty() {
        return None;
    }

    Some(TsvWord {
        key: (
            fields[1].parse().ok()?,
            fields[2].parse().ok()?,
            fields[3].parse().ok()?,
            fields[4].parse().ok()?,
        ),
        left: fields[6].parse().ok()?,
        top: fields[7].parse().ok()?,
        width: fields[8].parse().ok()?,
        height: fields[9].parse().ok()?,
        conf,
        text,
    })
}
