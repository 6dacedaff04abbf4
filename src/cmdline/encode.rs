//! Argument vector → command line.

use std::borrow::Cow;
use std::iter::Peekable;

/// Characters that force an argument into quotes.
const QUOTE_TRIGGERS: [char; 4] = [' ', '\t', '\n', '"'];

/// A piece of one argument, split at backslash runs and quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Backslashes(usize),
    Quote,
}

struct Segments<'a> {
    rest: &'a str,
}

impl<'a> Segments<'a> {
    fn new(arg: &'a str) -> Peekable<Self> {
        Self { rest: arg }.peekable()
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = *self.rest.as_bytes().first()?;
        let (segment, consumed) = match first {
            b'\\' => {
                let run = self.rest.bytes().take_while(|&b| b == b'\\').count();
                (Segment::Backslashes(run), run)
            }
            b'"' => (Segment::Quote, 1),
            _ => {
                let end = self
                    .rest
                    .find(['\\', '"'])
                    .unwrap_or(self.rest.len());
                (Segment::Literal(&self.rest[..end]), end)
            }
        };
        // Split points are ASCII, so `consumed` is always a char boundary.
        self.rest = &self.rest[consumed..];
        Some(segment)
    }
}

/// Output produced for a quoted argument, between the surrounding quotes.
enum Piece<'a> {
    Text(&'a str),
    Backslashes(usize),
}

fn needs_quoting(arg: &str) -> bool {
    arg.is_empty() || arg.contains(QUOTE_TRIGGERS)
}

/// Walk the body of a quoted argument.
///
/// A backslash run is doubled when the decoder would otherwise read it as
/// escaping the quote after it: either a literal quote (which then gets one
/// more backslash of its own) or the closing quote.
fn walk_quoted<'a>(arg: &'a str, mut emit: impl FnMut(Piece<'a>)) {
    let mut segments = Segments::new(arg);
    while let Some(segment) = segments.next() {
        match segment {
            Segment::Literal(text) => emit(Piece::Text(text)),
            Segment::Backslashes(run) => {
                let count = match segments.peek() {
                    Some(Segment::Quote) | None => run * 2,
                    Some(_) => run,
                };
                emit(Piece::Backslashes(count));
            }
            Segment::Quote => emit(Piece::Text("\\\"")),
        }
    }
}

fn quoted_len(arg: &str) -> usize {
    let mut len = 2;
    walk_quoted(arg, |piece| match piece {
        Piece::Text(text) => len += text.len(),
        Piece::Backslashes(count) => len += count,
    });
    len
}

fn push_quoted(out: &mut String, arg: &str) {
    out.push('"');
    walk_quoted(arg, |piece| match piece {
        Piece::Text(text) => out.push_str(text),
        Piece::Backslashes(count) => out.extend(std::iter::repeat('\\').take(count)),
    });
    out.push('"');
}

/// Encode a single argument.
///
/// Arguments with no whitespace or quotes are returned unchanged.
pub fn encode_arg(arg: &str) -> Cow<'_, str> {
    if !needs_quoting(arg) {
        return Cow::Borrowed(arg);
    }
    let mut out = String::with_capacity(quoted_len(arg));
    push_quoted(&mut out, arg);
    Cow::Owned(out)
}

/// Exact length of `encode(args)`.
pub fn encoded_len<S: AsRef<str>>(args: &[S]) -> usize {
    let separators = args.len().saturating_sub(1);
    args.iter()
        .map(|arg| {
            let arg = arg.as_ref();
            if needs_quoting(arg) {
                quoted_len(arg)
            } else {
                arg.len()
            }
        })
        .sum::<usize>()
        + separators
}

/// Encode an argument vector into one command line, arguments separated by
/// a single space.
pub fn encode<S: AsRef<str>>(args: &[S]) -> String {
    let mut out = String::with_capacity(encoded_len(args));
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let arg = arg.as_ref();
        if needs_quoting(arg) {
            push_quoted(&mut out, arg);
        } else {
            out.push_str(arg);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_split_runs() {
        let segments: Vec<_> = Segments::new(r#"ab\\"c\"#).collect();
        assert_eq!(
            segments,
            vec![
                Segment::Literal("ab"),
                Segment::Backslashes(2),
                Segment::Quote,
                Segment::Literal("c"),
                Segment::Backslashes(1),
            ]
        );
    }

    #[test]
    fn fast_path_is_identity() {
        for arg in ["plain", r"C:\dir\file", r"trailing\", "ünïcödé"] {
            assert!(matches!(encode_arg(arg), Cow::Borrowed(a) if a == arg));
        }
    }

    #[test]
    fn empty_argument_is_quoted() {
        assert_eq!(encode_arg(""), r#""""#);
        assert_eq!(encode(&["a", "", "b"]), r#"a "" b"#);
    }

    #[test]
    fn trailing_backslashes_are_doubled() {
        assert_eq!(encode_arg(r"a b\"), r#""a b\\""#);
        assert_eq!(encode_arg(r"a b\\"), r#""a b\\\\""#);
    }

    #[test]
    fn backslashes_before_quote_double_plus_one() {
        assert_eq!(encode_arg(r#"a\"b"#), r#""a\\\"b""#);
        assert_eq!(encode_arg(r#"a\\"b"#), r#""a\\\\\"b""#);
    }

    #[test]
    fn bare_quote_gets_one_backslash() {
        assert_eq!(encode_arg(r#"a"b"#), r#""a\"b""#);
        assert_eq!(encode_arg(r#"""#), r#""\"""#);
    }

    #[test]
    fn interior_backslashes_unchanged() {
        assert_eq!(encode_arg(r"C:\Program Files\x"), r#""C:\Program Files\x""#);
    }

    #[test]
    fn mixed_vector() {
        // `trail\` has nothing that forces quoting, so it stays bare on purpose.
        assert_eq!(
            encode(&["program", "two words", r"trail\"]),
            r#"program "two words" trail\"#
        );
        assert_eq!(
            encode(&["program", "two words", r"trail end\"]),
            r#"program "two words" "trail end\\""#
        );
    }

    #[test]
    fn length_is_exact() {
        let args = ["x", "", "a b", r#"q"q"#, r"\\ \\", "\t\n", r#"\\""#];
        assert_eq!(encoded_len(&args), encode(&args).len());
        assert_eq!(encoded_len::<&str>(&[]), 0);
    }
}
