use super::TextRange;
use error_set::error_set;
use nom::{
    IResult, Parser,
    bytes::complete::take_while1,
    character::complete::{char, digit1, one_of, space1},
    combinator::{map_res, opt},
    multi::separated_list1,
    sequence::preceded,
};

error_set! {
    /// Errors from reading a `@@ ... @@` hunk header as a two-sided range
    HunkHeaderError := {
        /// The header has more than one `-` segment, as in `diff --cc` output
        #[display("Combined diffs are not supported: {header}")]
        UnsupportedCombinedDiff { header: String },
        /// The header does not carry readable `-start,len +start,len` segments
        #[display("Malformed hunk header: {header}")]
        MalformedHunkHeader { header: String },
    }
}

/// What git prints after a line that lacks a trailing newline.
pub const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

text_range_newtype! {
    /// One hunk, from its `@@` line up to the next section.
    Hunk
}

impl<'a> Hunk<'a> {
    /// Number of mode characters per body line.
    ///
    /// One for a normal diff, one per parent for combined (`@@@`) diffs.
    #[must_use]
    pub fn mode_len(&self) -> usize {
        self.text
            .chars()
            .take_while(|&c| c == '@')
            .count()
            .saturating_sub(1)
    }

    fn content_start(&self) -> usize {
        self.text.find('\n').map_or(self.text.len(), |i| i + 1)
    }

    /// The `@@ ... @@` line.
    #[must_use]
    pub fn header(&self) -> HunkHeader<'a> {
        let text = self.0.text;
        HunkHeader(TextRange::new(&text[..self.content_start()], self.a))
    }

    /// Everything after the `@@` line.
    #[must_use]
    pub fn content(&self) -> HunkContent<'a> {
        let text = self.0.text;
        let start = self.content_start();
        HunkContent {
            range: TextRange::with_end(&text[start..], self.a + start, self.b),
            mode_len: self.mode_len(),
        }
    }

    /// Whether the body carries a `\ No newline at end of file` line.
    ///
    /// Only the leading `\ ` is checked; the rest of the marker is localized
    /// by git.
    #[must_use]
    pub fn has_no_newline_marker(&self) -> bool {
        self.content().text.contains("\n\\ ")
    }
}

text_range_newtype! {
    /// The first line of a hunk, e.g. `@@ -685,8 +686,14 @@ fn main() {`.
    HunkHeader
}

impl HunkHeader<'_> {
    /// All `(start, length)` segments of the header, in order.
    ///
    /// Never fails: combined diffs yield one pair per parent plus the result,
    /// garbage yields an empty list. A missing length reads as 1.
    #[must_use]
    pub fn safely_parse_metadata(&self) -> Vec<(usize, usize)> {
        metadata(self.text)
            .map(|(_, segments)| segments.into_iter().map(|(_, range)| range).collect())
            .unwrap_or_default()
    }

    /// `(a_start, a_length, b_start, b_length)` of a two-sided hunk.
    ///
    /// # Errors
    ///
    /// [`HunkHeaderError::UnsupportedCombinedDiff`] for headers with more
    /// than two segments, [`HunkHeaderError::MalformedHunkHeader`] if the
    /// segments cannot be read.
    pub fn parse(&self) -> Result<(usize, usize, usize, usize), HunkHeaderError> {
        let header = || self.first_line().to_string();
        let Ok((_, segments)) = metadata(self.text) else {
            return Err(HunkHeaderError::MalformedHunkHeader { header: header() });
        };
        match segments.as_slice() {
            [('-', (a_start, a_length)), ('+', (b_start, b_length))] => {
                Ok((*a_start, *a_length, *b_start, *b_length))
            }
            segments if segments.len() > 2 => {
                Err(HunkHeaderError::UnsupportedCombinedDiff { header: header() })
            }
            _ => Err(HunkHeaderError::MalformedHunkHeader { header: header() }),
        }
    }

    /// Start line of the resulting file ("+" side), e.g. 686 for
    /// `@@ -685,8 +686,14 @@`.
    #[must_use]
    pub fn to_line_start(&self) -> Option<usize> {
        self.safely_parse_metadata().last().map(|&(start, _)| start)
    }
}

fn number(input: &str) -> IResult<&str, usize> {
    map_res(digit1, |digits: &str| digits.parse::<usize>()).parse(input)
}

/// `start[,length]`
fn line_range(input: &str) -> IResult<&str, (usize, usize)> {
    (number, opt(preceded(char(','), number)))
        .map(|(start, length)| (start, length.unwrap_or(1)))
        .parse(input)
}

/// `-start[,length]` or `+start[,length]`
fn segment(input: &str) -> IResult<&str, (char, (usize, usize))> {
    (one_of("-+"), line_range).parse(input)
}

/// `@@[@...] segment (' ' segment)* ...`; whatever follows the last segment
/// (closing `@@`, function context) is left unparsed.
fn metadata(input: &str) -> IResult<&str, Vec<(char, (usize, usize))>> {
    preceded(
        (take_while1(|c: char| c == '@'), space1),
        separated_list1(space1, segment),
    )
    .parse(input)
}

/// The body of a hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HunkContent<'a> {
    pub range: TextRange<'a>,
    pub mode_len: usize,
}

impl<'a> std::ops::Deref for HunkContent<'a> {
    type Target = TextRange<'a>;

    fn deref(&self) -> &Self::Target {
        &self.range
    }
}

impl<'a> HunkContent<'a> {
    #[must_use]
    pub fn lines(&self) -> Vec<HunkLine<'a>> {
        self.range
            .lines()
            .into_iter()
            .map(|range| HunkLine {
                range,
                mode_len: self.mode_len,
            })
            .collect()
    }
}

/// One body line: `mode_len` mode characters followed by the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HunkLine<'a> {
    pub range: TextRange<'a>,
    pub mode_len: usize,
}

impl<'a> std::ops::Deref for HunkLine<'a> {
    type Target = TextRange<'a>;

    fn deref(&self) -> &Self::Target {
        &self.range
    }
}

impl<'a> HunkLine<'a> {
    #[must_use]
    pub fn mode(&self) -> &'a str {
        let text = self.range.text;
        text.get(..self.mode_len).unwrap_or(text)
    }

    /// The line without its mode prefix, line ending included.
    #[must_use]
    pub fn content(&self) -> &'a str {
        self.range.text.get(self.mode_len..).unwrap_or("")
    }

    #[must_use]
    pub fn is_from_line(&self) -> bool {
        !self.is_no_newline_marker() && self.mode().contains('-')
    }

    #[must_use]
    pub fn is_to_line(&self) -> bool {
        !self.is_no_newline_marker() && self.mode().contains('+')
    }

    #[must_use]
    pub fn is_context(&self) -> bool {
        self.mode().trim().is_empty()
    }

    #[must_use]
    pub fn is_no_newline_marker(&self) -> bool {
        self.range.text.trim_end_matches(['\n', '\r']) == NO_NEWLINE_MARKER
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_segments() -> impl Strategy<Value = Vec<(usize, Option<usize>)>> {
        prop::collection::vec((0..10_000usize, prop::option::of(0..500usize)), 1..5)
    }

    fn render(parents: &[(usize, Option<usize>)], result: (usize, Option<usize>)) -> String {
        let fmt = |sign: char, (start, len): (usize, Option<usize>)| match len {
            Some(len) => format!("{sign}{start},{len}"),
            None => format!("{sign}{start}"),
        };
        let ats = "@".repeat(parents.len() + 1);
        let mut segments: Vec<String> = parents.iter().map(|&p| fmt('-', p)).collect();
        segments.push(fmt('+', result));
        format!("{ats} {} {ats} context\n", segments.join(" "))
    }

    proptest! {
        /// The total parser reads every segment; the strict one fails exactly
        /// for combined headers.
        #[test]
        fn metadata_parsers_agree(
            parents in arb_segments(),
            result in (0..10_000usize, prop::option::of(0..500usize)),
        ) {
            let text = render(&parents, result);
            let header = HunkHeader(TextRange::new(&text, 0));
            let metadata = header.safely_parse_metadata();
            prop_assert_eq!(metadata.len(), parents.len() + 1);
            prop_assert_eq!(header.parse().is_err(), metadata.len() > 2);
        }

        #[test]
        fn total_parser_never_panics(text in "\\PC*") {
            let header = HunkHeader(TextRange::new(&text, 0));
            let _ = header.safely_parse_metadata();
        }
    }
}
