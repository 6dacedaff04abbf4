//! Command line → argument vector.
//!
//! Reference decoder for the Microsoft C runtime grammar (the post-2008
//! rules, where `""` inside a quoted region is a literal quote). Every token,
//! including the first, is parsed with the argument rules.

/// Split a command line into arguments.
pub fn decode(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(' ' | '\t')) {
            chars.next();
        }
        if chars.peek().is_none() {
            return args;
        }

        let mut arg = String::new();
        let mut in_quotes = false;

        while let Some(&c) = chars.peek() {
            match c {
                ' ' | '\t' if !in_quotes => break,
                '\\' => {
                    let mut run = 0;
                    while chars.next_if_eq(&'\\').is_some() {
                        run += 1;
                    }
                    if chars.peek() == Some(&'"') {
                        arg.extend(std::iter::repeat('\\').take(run / 2));
                        if run % 2 == 1 {
                            chars.next();
                            arg.push('"');
                        }
                    } else {
                        arg.extend(std::iter::repeat('\\').take(run));
                    }
                }
                '"' => {
                    chars.next();
                    if in_quotes && chars.peek() == Some(&'"') {
                        chars.next();
                        arg.push('"');
                    } else {
                        in_quotes = !in_quotes;
                    }
                }
                _ => {
                    chars.next();
                    arg.push(c);
                }
            }
        }

        args.push(arg);
    }
}

#[cfg(test)]
mod tests {
    use super::decode;

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(decode("  a\tb   c "), vec!["a", "b", "c"]);
        assert!(decode("").is_empty());
        assert!(decode(" \t ").is_empty());
    }

    #[test]
    fn quotes_group_and_vanish() {
        assert_eq!(decode(r#""a b" c"#), vec!["a b", "c"]);
        assert_eq!(decode(r#"x"y z"w"#), vec!["xy zw"]);
        assert_eq!(decode(r#""""#), vec![""]);
        assert_eq!(decode(r#"a "" b"#), vec!["a", "", "b"]);
    }

    #[test]
    fn backslash_rules() {
        // Not before a quote: literal.
        assert_eq!(decode(r"a\\b c\"), vec![r"a\\b", r"c\"]);
        // Even run before a quote: halved, quote toggles.
        assert_eq!(decode(r#""a\\" b"#), vec![r"a\", "b"]);
        // Odd run before a quote: halved, quote is literal.
        assert_eq!(decode(r#"a\\\"b"#), vec![r#"a\"b"#]);
        assert_eq!(decode(r#"\"x"#), vec![r#""x"#]);
    }

    #[test]
    fn doubled_quote_inside_quotes_is_literal() {
        assert_eq!(decode(r#""a""b""#), vec![r#"a"b"#]);
    }

    #[test]
    fn newline_is_not_a_separator() {
        assert_eq!(decode("a\nb"), vec!["a\nb"]);
    }
}
