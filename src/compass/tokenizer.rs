//! Record tokenizer for Compass `.DAT` text.
//!
//! A `.DAT` file holds one or more survey blocks separated by an ASCII form
//! feed, optionally followed by a `\x1A` "soft EOF". Within a block, header
//! lines run up to the shot-table column line; everything after it is one
//! shot record per line. The tokenizers here are lazy, single-pass, and
//! finite; callers needing multiple passes must materialize.

/// One raw line with its 1-based line number in the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub text: &'a str,
    pub number: usize,
}

/// The header lines of one survey block, up to and including the shot-table
/// column line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderBlock<'a> {
    pub lines: Vec<Line<'a>>,
}

impl<'a> HeaderBlock<'a> {
    /// Line number of the first header line, for error context.
    pub fn first_line(&self) -> usize {
        self.lines.first().map(|line| line.number).unwrap_or(1)
    }
}

/// One tokenized element of a survey block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record<'a> {
    Header(HeaderBlock<'a>),
    Shot(Line<'a>),
}

const FORM_FEED: char = '\x0c';
const SOFT_EOF: &str = "\x1a";

/// Lazy iterator over the survey blocks of a `.DAT` file.
///
/// Empty blocks and the Compass soft-EOF marker are skipped.
pub fn survey_blocks(content: &str) -> SurveyBlocks<'_> {
    SurveyBlocks {
        remaining: Some(content),
        next_line: 1,
    }
}

pub struct SurveyBlocks<'a> {
    remaining: Option<&'a str>,
    next_line: usize,
}

/// One form-feed-delimited survey block.
#[derive(Debug, Clone, Copy)]
pub struct SurveyBlock<'a> {
    text: &'a str,
    first_line: usize,
}

impl<'a> Iterator for SurveyBlocks<'a> {
    type Item = SurveyBlock<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let remaining = self.remaining?;
            let (chunk, rest) = match remaining.find(FORM_FEED) {
                Some(at) => (&remaining[..at], Some(&remaining[at + 1..])),
                None => (remaining, None),
            };
            self.remaining = rest;

            let first_line = self.next_line;
            self.next_line += chunk.lines().count();

            let trimmed = chunk.trim();
            if trimmed.is_empty() || trimmed == SOFT_EOF {
                continue;
            }
            return Some(SurveyBlock {
                text: chunk,
                first_line,
            });
        }
    }
}

impl<'a> SurveyBlock<'a> {
    /// Line number of the first line of this block.
    pub fn first_line(&self) -> usize {
        self.first_line
    }

    /// Tokenize this block into a header followed by shot lines.
    pub fn records(&self) -> RecordTokenizer<'a> {
        RecordTokenizer {
            lines: self.text.lines(),
            next_line: self.first_line,
            in_header: true,
        }
    }
}

/// Single-pass tokenizer over one survey block: yields the header block
/// first, then one record per shot line.
pub struct RecordTokenizer<'a> {
    lines: std::str::Lines<'a>,
    next_line: usize,
    in_header: bool,
}

impl<'a> RecordTokenizer<'a> {
    fn take_line(&mut self) -> Option<Line<'a>> {
        let text = self.lines.next()?;
        let line = Line {
            text,
            number: self.next_line,
        };
        self.next_line += 1;
        Some(line)
    }

    /// The shot-table column line starts with the FROM and TO column names.
    /// Both are required: a cave name line can begin with the word FROM.
    fn is_column_line(text: &str) -> bool {
        let mut tokens = text.split_whitespace();
        tokens.next() == Some("FROM") && tokens.next() == Some("TO")
    }
}

impl<'a> Iterator for RecordTokenizer<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.in_header {
            self.in_header = false;
            let mut lines = Vec::new();
            // Leading blank lines belong to inter-block padding, not the header
            loop {
                let line = self.take_line()?;
                if lines.is_empty() && line.text.trim().is_empty() {
                    continue;
                }
                let done = Self::is_column_line(line.text);
                lines.push(line);
                if done {
                    break;
                }
            }
            return Some(Record::Header(HeaderBlock { lines }));
        }

        loop {
            let line = self.take_line()?;
            let trimmed = line.text.trim();
            if trimmed.is_empty() || trimmed == SOFT_EOF {
                continue;
            }
            return Some(Record::Shot(line));
        }
    }
}
