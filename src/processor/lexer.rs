//! Line scanner for material scripts.
//!
//! The script language is line oriented: every statement sits on its own
//! line and braces normally do too. We only trim lines, drop blank ones and
//! whole-line `//` comments, and split off stand-alone `{` / `}` tokens so
//! that `pass base { lighting off }` reads the same as the multi-line form.
//! A `//` in the middle of a line is *not* a comment.
//
//  Grammar excerpts (informal):
//
//      script    ::= (comment | blank | statement)*
//      comment   ::= "//" rest-of-line
//      statement ::= keyword [params] ["{" body "}"]

use std::collections::VecDeque;
use std::io::{self, BufRead, Lines};

/// One logical line; `number` is the 1-based physical line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    pub number: usize,
    pub text: String,
}

pub struct LineScanner<B> {
    lines: Lines<B>,
    number: usize,
    pending: VecDeque<ScriptLine>,
}

impl<B: BufRead> LineScanner<B> {
    pub fn new(input: B) -> Self {
        Self {
            lines: input.lines(),
            number: 0,
            pending: VecDeque::new(),
        }
    }

    /// Queue the pieces of one trimmed, non-comment line.
    fn split_braces(&mut self, line: &str) {
        let mut current = String::new();
        for token in line.split_whitespace() {
            if token == "{" || token == "}" {
                self.flush(&mut current);
                self.pending.push_back(ScriptLine {
                    number: self.number,
                    text: token.to_owned(),
                });
            } else {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(token);
            }
        }
        self.flush(&mut current);
    }

    fn flush(&mut self, current: &mut String) {
        if !current.is_empty() {
            self.pending.push_back(ScriptLine {
                number: self.number,
                text: std::mem::take(current),
            });
        }
    }
}

impl<B: BufRead> Iterator for LineScanner<B> {
    type Item = io::Result<ScriptLine>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Some(Ok(line));
            }
            let raw = match self.lines.next()? {
                Ok(raw) => raw,
                Err(e) => return Some(Err(e)),
            };
            self.number += 1;

            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with("//") {
                continue;
            }
            if trimmed.contains('{') || trimmed.contains('}') {
                self.split_braces(trimmed);
            } else {
                return Some(Ok(ScriptLine {
                    number: self.number,
                    text: trimmed.to_owned(),
                }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(src: &str) -> Vec<(usize, String)> {
        LineScanner::new(src.as_bytes())
            .map(|l| l.unwrap())
            .map(|l| (l.number, l.text))
            .collect()
    }

    #[test]
    fn test_skips_blank_and_comment_lines() {
        let src = "// header\n\nmaterial Rock\n{\n   // inside\n\tlighting off  \n}\n";
        assert_eq!(
            scan(src),
            vec![
                (3, "material Rock".to_string()),
                (4, "{".to_string()),
                (6, "lighting off".to_string()),
                (7, "}".to_string()),
            ]
        );
    }

    #[test]
    fn test_splits_inline_braces() {
        let test_cases = vec![
            (
                "pass base { ambient 1 1 1 }",
                vec!["pass base", "{", "ambient 1 1 1", "}"],
            ),
            ("material Rock {", vec!["material Rock", "{"]),
            ("} }", vec!["}", "}"]),
            // braces glued to a word are left alone
            ("source {weird}.cg", vec!["source {weird}.cg"]),
        ];

        for (src, expected) in test_cases {
            let texts: Vec<String> = scan(src).into_iter().map(|(_, t)| t).collect();
            assert_eq!(texts, expected, "{src}");
        }
    }

    #[test]
    fn test_trailing_comment_is_kept() {
        assert_eq!(scan("lighting off // no"), vec![(1, "lighting off // no".to_string())]);
    }

    #[test]
    fn test_split_pieces_share_line_number() {
        let numbers: Vec<usize> = scan("\n\ntexture_unit { }").into_iter().map(|(n, _)| n).collect();
        assert_eq!(numbers, vec![3, 3, 3]);
    }
}
