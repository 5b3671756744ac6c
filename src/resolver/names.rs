//! Parsing and normalising the `"Title by Artist"` strings the model returns.

/// A song name split into its parts. `artist` is empty when the model did
/// not follow the "Title by Artist" format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongName {
    pub title: String,
    pub artist: String,
}

/// Split on the last " by " (case-insensitive), so titles like
/// "Stand by Me by Ben E. King" keep their own "by".
pub fn parse_song_name(raw: &str) -> SongName {
    let cleaned = trim_quotes(strip_list_marker(raw.trim()));

    match rfind_separator(cleaned) {
        Some(i) if i > 0 => SongName {
            title: trim_quotes(&cleaned[..i]).to_string(),
            artist: trim_quotes(&cleaned[i + 4..]).to_string(),
        },
        _ => SongName {
            title: cleaned.to_string(),
            artist: String::new(),
        },
    }
}

/// Byte offset of the last " by ", ignoring ASCII case. Only char
/// boundaries are tried, so the offset is always safe to slice at.
fn rfind_separator(s: &str) -> Option<usize> {
    s.char_indices().rev().map(|(i, _)| i).find(|&i| {
        s[i..]
            .get(..4)
            .is_some_and(|window| window.eq_ignore_ascii_case(" by "))
    })
}

fn trim_quotes(s: &str) -> &str {
    s.trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '“' || c == '”')
        .trim()
}

/// Drop leading "1.", "12)", "-", "*" list markers.
fn strip_list_marker(s: &str) -> &str {
    let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &s[digits..];
        if let Some(r) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return r.trim_start();
        }
        return s;
    }
    s.strip_prefix("- ")
        .or_else(|| s.strip_prefix("* "))
        .map(str::trim_start)
        .unwrap_or(s)
}

/// Extract the primary (first) artist from a multi-artist credit.
///
/// "The Kid LAROI, Justin Bieber" → "The Kid LAROI"
/// "Mark Ronson feat. Bruno Mars" → "Mark Ronson"
pub fn primary_artist(artist: &str) -> String {
    let mut primary = artist;
    for sep in [",", " & ", " feat.", " ft.", " featuring ", " x "] {
        if let Some((head, _)) = primary.split_once(sep) {
            primary = head;
        }
    }
    primary.trim().to_string()
}

/// Strip parenthetical noise like "(Remastered)", "[Official Video]" and
/// trailing "feat." credits that throw search off.
pub fn clean_title(title: &str) -> String {
    let mut result = String::with_capacity(title.len());
    let mut depth = 0i32;
    for c in title.chars() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => {
                depth = (depth - 1).max(0);
                continue;
            }
            _ if depth == 0 => result.push(c),
            _ => {}
        }
    }

    let result = result.split(" feat.").next().unwrap_or(&result).to_string();
    let result = result.split(" ft.").next().unwrap_or(&result).to_string();

    let trimmed = result.trim();
    if trimmed.is_empty() {
        title.trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Loose containment match on lowercased strings, either direction.
pub fn loosely_matches(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}
