//! Prompt templates and their typed inputs/outputs.
//!
//! Templates use a tiny handlebars subset: `{{{var}}}` / `{{var}}` for
//! substitution and a single, non-nested `{{#if var}}..{{else}}..{{/if}}`.

use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use super::errors::PromptError;

pub struct PromptTemplate {
    pub name: &'static str,
    pub template: &'static str,
}

pub const ANALYZE_LISTENING_HISTORY: PromptTemplate = PromptTemplate {
    name: "analyzeListeningHistoryPrompt",
    template: r#"You are an expert music analyst. Analyze the user's YouTube Music listening history to determine their music preferences. Extract genre, artist, and song preferences, and create an overall taste profile.

Listening History: {{{listeningHistory}}}

Output the preferences as JSON arrays of strings, and the overall taste profile as a string.

Make sure to include a wide variety of genres, artists and songs if they exist in the listening history. Be as comprehensive as possible.
"#,
};

pub const GENERATE_PLAYLIST: PromptTemplate = PromptTemplate {
    name: "generatePlaylistPrompt",
    template: r#"You are a personal DJ that generates playlists based on a user's taste and current song requests.

Current Requests: {{{currentRequests}}}

{{#if listeningHistory}}
The user's listening history is provided below. Use it as a strong indicator of their taste.
Listening History: {{{listeningHistory}}}
{{else}}
No listening history is available. For a "radio" request, generate a playlist of popular and critically acclaimed songs from various genres. For a specific request (e.g., '90s rock'), generate a playlist based on that request.
{{/if}}

Please create a playlist of {{songCount}} songs that the user will enjoy. Respond with an array of song names, with each song formatted as 'Song Name by Artist Name'."#,
};

pub struct AnalyzeListeningHistoryInput<'a> {
    pub listening_history: &'a str,
}

impl<'a> AnalyzeListeningHistoryInput<'a> {
    pub fn vars(&self) -> HashMap<&'static str, String> {
        HashMap::from([("listeningHistory", self.listening_history.to_string())])
    }
}

pub struct GeneratePlaylistInput<'a> {
    /// May be empty when no history is available.
    pub listening_history: &'a str,
    pub current_requests: &'a str,
    pub song_count: usize,
}

impl<'a> GeneratePlaylistInput<'a> {
    pub fn vars(&self) -> HashMap<&'static str, String> {
        HashMap::from([
            ("listeningHistory", self.listening_history.to_string()),
            ("currentRequests", self.current_requests.to_string()),
            ("songCount", self.song_count.to_string()),
        ])
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratePlaylistOutput {
    pub playlist: Vec<String>,
}

pub fn analysis_output_schema() -> Value {
    let string_list = |description: &str| {
        json!({
            "type": "ARRAY",
            "description": description,
            "items": { "type": "STRING" }
        })
    };

    json!({
        "type": "OBJECT",
        "properties": {
            "genrePreferences": string_list("The user's preferred music genres, extracted from the listening history."),
            "artistPreferences": string_list("The user's preferred artists, extracted from the listening history."),
            "songPreferences": string_list("The user's preferred songs, extracted from the listening history."),
            "overallTasteProfile": {
                "type": "STRING",
                "description": "A summary of the user's overall music taste profile."
            }
        },
        "required": ["genrePreferences", "artistPreferences", "songPreferences", "overallTasteProfile"]
    })
}

pub fn playlist_output_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "playlist": {
                "type": "ARRAY",
                "description": "A list of song names for the playlist.",
                "items": {
                    "type": "STRING",
                    "description": "A song name and artist, in the format 'Song Name by Artist Name'"
                }
            }
        },
        "required": ["playlist"]
    })
}

pub fn render(template: &str, vars: &HashMap<&'static str, String>) -> Result<String, PromptError> {
    let expanded = expand_conditionals(template, vars)?;
    substitute(&expanded, vars)
}

fn is_truthy(vars: &HashMap<&'static str, String>, name: &str) -> bool {
    vars.get(name).is_some_and(|v| !v.trim().is_empty())
}

fn expand_conditionals(
    template: &str,
    vars: &HashMap<&'static str, String>,
) -> Result<String, PromptError> {
    const OPEN: &str = "{{#if ";
    const ELSE: &str = "{{else}}";
    const CLOSE: &str = "{{/if}}";

    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];
        let tag_end = after
            .find("}}")
            .ok_or_else(|| PromptError::Template("unterminated {{#if}} tag".to_string()))?;
        let name = after[..tag_end].trim();
        let block = &after[tag_end + 2..];
        let block_end = block
            .find(CLOSE)
            .ok_or_else(|| PromptError::Template(format!("missing {{{{/if}}}} for '{}'", name)))?;
        let body = &block[..block_end];
        if body.contains(OPEN) {
            return Err(PromptError::Template("nested {{#if}} is not supported".to_string()));
        }

        let (then_part, else_part) = match body.find(ELSE) {
            Some(i) => (&body[..i], &body[i + ELSE.len()..]),
            None => (body, ""),
        };
        out.push_str(if is_truthy(vars, name) { then_part } else { else_part });
        rest = &block[block_end + CLOSE.len()..];
    }

    out.push_str(rest);
    Ok(out)
}

fn substitute(template: &str, vars: &HashMap<&'static str, String>) -> Result<String, PromptError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let (open, close) = if rest[start..].starts_with("{{{") {
            ("{{{", "}}}")
        } else {
            ("{{", "}}")
        };
        let after = &rest[start + open.len()..];
        let end = after
            .find(close)
            .ok_or_else(|| PromptError::Template("unterminated variable tag".to_string()))?;
        let name = after[..end].trim();
        let value = vars
            .get(name)
            .ok_or_else(|| PromptError::Template(format!("unknown variable '{}'", name)))?;
        out.push_str(value);
        rest = &after[end + close.len()..];
    }

    out.push_str(rest);
    Ok(out)
}
