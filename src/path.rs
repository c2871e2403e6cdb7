use serde_json::Value;

use crate::parser::{ParseError, Parser};

/// A parsed dot path such as `spec.ports[0].name` or `spec.ports.0.name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String), // .foo or ['foo']
    Index(usize), // [0]
}

impl Path {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let mut p = Parser::new(input);
        let mut segments = Vec::new();
        let mut expect_key = true;

        while !p.eof() {
            if p.consume_char('[') {
                if p.peek_char() == Some('\'') || p.peek_char() == Some('"') {
                    segments.push(Segment::Key(p.parse_quoted_string()?));
                } else {
                    segments.push(Segment::Index(p.parse_index()?));
                }
                p.expect(']')?;
                expect_key = false;
                continue;
            }
            if !expect_key {
                p.expect('.')?;
            }
            let key = p.take_until_any(&['.', '[']);
            if key.is_empty() {
                return Err(ParseError::InvalidSyntax(format!(
                    "empty path segment at offset {}",
                    p.position()
                )));
            }
            segments.push(Segment::Key(key.to_string()));
            expect_key = false;
        }

        if segments.is_empty() {
            return Err(ParseError::InvalidSyntax("empty path".into()));
        }
        Ok(Path { segments })
    }

    /// Walk `root` along this path. A key segment that reads as a number also
    /// indexes into arrays, so `a.0` and `a[0]` are equivalent.
    pub fn pick<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(root, |current, seg| match (seg, current) {
                (Segment::Key(k), Value::Object(map)) => map.get(k),
                (Segment::Key(k), Value::Array(arr)) => {
                    k.parse::<usize>().ok().and_then(|idx| arr.get(idx))
                }
                (Segment::Index(idx), Value::Array(arr)) => arr.get(*idx),
                _ => None,
            })
    }
}
