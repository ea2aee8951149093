//! Single-pass mention tokenizer.
//!
//! Reply text is walked once from left to right. At each `@` the member
//! names are tried longest first, then the everyone tokens; either must end
//! on a word boundary. Matched text leaves the input as a segment and is
//! never looked at again, so a name that contains another name cannot be
//! matched twice. Markup already in the text (`<at .../>`, `<face .../>`)
//! is copied through untouched.

use brain_core::Segment;

use crate::directory::Member;

/// Words after `@` that address the whole channel.
const EVERYONE_TOKENS: &[&str] = &["everyone", "all"];

/// Split reply text into text and mention segments.
pub fn tokenize(text: &str, members: &[Member]) -> Vec<Segment> {
    let mut names: Vec<&Member> = members
        .iter()
        .filter(|m| !m.display_name.is_empty())
        .collect();
    names.sort_by(|a, b| b.display_name.len().cmp(&a.display_name.len()));

    let mut segments = Vec::new();
    let mut buf = String::new();
    let mut rest = text;

    while let Some(ch) = rest.chars().next() {
        if ch == '<' {
            if let Some(len) = markup_len(rest) {
                buf.push_str(&rest[..len]);
                rest = &rest[len..];
                continue;
            }
        }
        if ch == '@' {
            let after = &rest[1..];
            if let Some(member) = names.iter().find(|m| name_at(after, &m.display_name)) {
                flush(&mut buf, &mut segments);
                segments.push(Segment::Mention {
                    id: member.member_id.clone(),
                    name: member.display_name.clone(),
                });
                rest = &after[member.display_name.len()..];
                continue;
            }
            if let Some(len) = everyone_len(after) {
                flush(&mut buf, &mut segments);
                segments.push(Segment::MentionAll);
                rest = &after[len..];
                continue;
            }
        }
        buf.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    flush(&mut buf, &mut segments);
    segments
}

fn flush(buf: &mut String, segments: &mut Vec<Segment>) {
    if !buf.is_empty() {
        segments.push(Segment::Text(std::mem::take(buf)));
    }
}

/// Whether `name` starts `s` and ends on a word boundary.
fn name_at(s: &str, name: &str) -> bool {
    s.starts_with(name) && ends_word(name, &s[name.len()..])
}

/// Length of an everyone token at the start of `s`, ending on a word boundary.
fn everyone_len(s: &str) -> Option<usize> {
    EVERYONE_TOKENS.iter().find_map(|token| {
        let head = s.get(..token.len())?;
        (head.eq_ignore_ascii_case(token) && ends_word(head, &s[token.len()..]))
            .then_some(token.len())
    })
}

/// False when `rest` continues the word that `head` ends with.
///
/// Scripts written without spaces (two non-ASCII word characters) never
/// continue each other, so `@小明你好` still matches `小明`.
fn ends_word(head: &str, rest: &str) -> bool {
    let word = |c: char| c.is_alphanumeric() || c == '_';
    match (head.chars().next_back(), rest.chars().next()) {
        (Some(last), Some(next)) if word(last) && word(next) => {
            !last.is_ascii() && !next.is_ascii()
        }
        _ => true,
    }
}

/// Length of a markup element at the start of `s`, quotes respected.
fn markup_len(s: &str) -> Option<usize> {
    let mut chars = s.char_indices().skip(1);
    let (_, first) = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    let mut in_quote = false;
    for (i, c) in chars {
        match c {
            '"' => in_quote = !in_quote,
            '>' if !in_quote => return Some(i + 1),
            '\n' if !in_quote => return None,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members() -> Vec<Member> {
        vec![
            Member::new("Ann", "u1"),
            Member::new("Anna", "u2"),
            Member::new("Bob", "u3"),
        ]
    }

    #[test]
    fn test_longest_name_wins() {
        let segments = tokenize("hi @Anna and @Ann", &members());
        assert_eq!(
            segments,
            vec![
                Segment::text("hi "),
                Segment::Mention {
                    id: "u2".into(),
                    name: "Anna".into()
                },
                Segment::text(" and "),
                Segment::Mention {
                    id: "u1".into(),
                    name: "Ann".into()
                },
            ]
        );
    }

    #[test]
    fn test_everyone_tokens() {
        let segments = tokenize("@everyone look, @ALL too", &[]);
        assert_eq!(
            segments,
            vec![
                Segment::MentionAll,
                Segment::text(" look, "),
                Segment::MentionAll,
                Segment::text(" too"),
            ]
        );
    }

    #[test]
    fn test_everyone_needs_word_boundary() {
        assert_eq!(tokenize("@allison", &[]), vec![Segment::text("@allison")]);
    }

    #[test]
    fn test_name_needs_word_boundary() {
        let members = vec![Member::new("Ann", "u1")];
        assert_eq!(tokenize("@Annabel", &members), vec![Segment::text("@Annabel")]);
        assert_eq!(
            tokenize("@Ann_x @Ann's", &members),
            vec![
                Segment::text("@Ann_x "),
                Segment::Mention {
                    id: "u1".into(),
                    name: "Ann".into()
                },
                Segment::text("'s"),
            ]
        );
    }

    #[test]
    fn test_unspaced_script_name_followed_by_text() {
        let members = vec![Member::new("小明", "u7")];
        assert_eq!(
            tokenize("@小明你好", &members),
            vec![
                Segment::Mention {
                    id: "u7".into(),
                    name: "小明".into()
                },
                Segment::text("你好"),
            ]
        );
    }

    #[test]
    fn test_member_named_like_token_beats_token() {
        let members = vec![Member::new("allison", "u9")];
        assert_eq!(
            tokenize("@allison", &members),
            vec![Segment::Mention {
                id: "u9".into(),
                name: "allison".into()
            }]
        );
    }

    #[test]
    fn test_existing_markup_is_not_rematched() {
        let text = r#"<at id="u3" name="@Bob"/> hey"#;
        assert_eq!(tokenize(text, &members()), vec![Segment::text(text)]);
    }

    #[test]
    fn test_unknown_name_stays_text() {
        assert_eq!(
            tokenize("mail me @ home, @Zed", &members()),
            vec![Segment::text("mail me @ home, @Zed")]
        );
    }

    #[test]
    fn test_multibyte_text() {
        let members = vec![Member::new("小明", "u7")];
        assert_eq!(
            tokenize("你好@小明!", &members),
            vec![
                Segment::text("你好"),
                Segment::Mention {
                    id: "u7".into(),
                    name: "小明".into()
                },
                Segment::text("!"),
            ]
        );
    }
}
