//! `${name}` / `${name:default}` placeholder scanning.

const PREFIX: &str = "${";
const SUFFIX: char = '}';
const VALUE_SEPARATOR: char = ':';

/// A piece of a placeholder expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text copied through unchanged.
    Literal(&'a str),
    /// A `${name}` or `${name:default}` marker.
    Placeholder {
        /// The property key to look up
        name: &'a str,
        /// Fallback text used when the key is absent
        default: Option<&'a str>,
    },
}

/// Split an expression into literal text and placeholder markers.
///
/// The default is everything after the first `:` inside the marker. An unterminated
/// `${` is kept as literal text.
pub fn segments(expression: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = expression;

    while let Some(start) = rest.find(PREFIX) {
        let body_start = start + PREFIX.len();
        let Some(body_len) = rest[body_start..].find(SUFFIX) else {
            break;
        };
        if start > 0 {
            segments.push(Segment::Literal(&rest[..start]));
        }
        let body = &rest[body_start..body_start + body_len];
        let (name, default) = match body.split_once(VALUE_SEPARATOR) {
            Some((name, default)) => (name, Some(default)),
            None => (body, None),
        };
        segments.push(Segment::Placeholder { name, default });
        rest = &rest[body_start + body_len + SUFFIX.len_utf8()..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }
    segments
}

/// Returns `true` if the expression contains at least one complete marker.
pub fn has_placeholders(expression: &str) -> bool {
    segments(expression)
        .iter()
        .any(|s| matches!(s, Segment::Placeholder { .. }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        assert_eq!(segments("plain"), vec![Segment::Literal("plain")]);
        assert!(segments("").is_empty());
        assert!(!has_placeholders("plain"));
    }

    #[test]
    fn test_single_placeholder() {
        assert_eq!(
            segments("${key}"),
            vec![Segment::Placeholder {
                name: "key",
                default: None
            }]
        );
    }

    #[test]
    fn test_mixed_with_default() {
        assert_eq!(
            segments("Hello, ${name:World}!"),
            vec![
                Segment::Literal("Hello, "),
                Segment::Placeholder {
                    name: "name",
                    default: Some("World")
                },
                Segment::Literal("!"),
            ]
        );
    }

    #[test]
    fn test_default_keeps_later_separators() {
        assert_eq!(
            segments("${url:http://localhost:80}"),
            vec![Segment::Placeholder {
                name: "url",
                default: Some("http://localhost:80")
            }]
        );
    }

    #[test]
    fn test_empty_default() {
        assert_eq!(
            segments("${key:}"),
            vec![Segment::Placeholder {
                name: "key",
                default: Some("")
            }]
        );
    }

    #[test]
    fn test_unterminated_marker_is_literal() {
        assert_eq!(
            segments("a ${b} ${c"),
            vec![
                Segment::Literal("a "),
                Segment::Placeholder {
                    name: "b",
                    default: None
                },
                Segment::Literal(" ${c"),
            ]
        );
    }
}
