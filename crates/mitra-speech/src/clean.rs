//! Speech text cleaning: markdown and greeting boilerplate are removed before
//! text is handed to the synthesis engine. The visible chat message is never
//! touched; this only shapes what is read aloud.

use once_cell::sync::Lazy;
use regex::Regex;

/// (pattern, replacement) pairs applied in order to strip markdown.
static MARKUP_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        // fence lines go, fenced content stays
        (r"(?m)^[ \t]*```[^\n]*$", ""),
        (r"(?m)^[ \t]*(?:-{3,}|\*{3,}|_{3,})[ \t]*$", ""),
        (r"!\[([^\]]*)\]\([^)]*\)", "$1"),
        (r"\[([^\]]+)\]\([^)]*\)", "$1"),
        (r"`([^`\n]*)`", "$1"),
        (r"`+", ""),
        (r"(?m)^[ \t]{0,3}#{1,6}[ \t]*", ""),
        (r"(?m)^[ \t]*>+[ \t]?", ""),
        (r"(?m)^[ \t]*[-*+•][ \t]+", ""),
        (r"\*\*([^*]+)\*\*", "$1"),
        (r"__([^_]+)__", "$1"),
        (r"~~([^~]+)~~", "$1"),
        (r"\*([^*\n]+)\*", "$1"),
        (r"(^|[\s(])_([^_\n]+)_", "${1}${2}"),
        (r"\*+", ""),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| compile(pattern).map(|re| (re, replacement)))
    .collect()
});

/// Leading phrases the assistant prepends to answers, in English and Hindi.
///
/// Each phrase must be closed by punctuation or the end of the text, so a
/// sentence that merely starts with the same word ("Thanks to ...",
/// "Hi-tech ...") is left alone.
static PREAMBLES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^(?:namaste|namaskar|namaskaram|hello|hi|greetings)\s*(?:[,!.।:]+|$)\s*",
        r"(?i)^(?:i\s+am|i'm|i’m|this\s+is)\s+bharat\s+mitra\s*(?:[,!.।:;]+|$)\s*",
        r"(?i)^here(?:'s|’s|\s+is)\s+(?:the|your)\s+answers?(?:\s+to\s+your\s+(?:question|query))?\s*(?:[.:;,!…]+|$)\s*",
        r"(?i)^(?:thank\s+you|thanks)(?:\s+so\s+much)?(?:\s+for\s+(?:asking|your\s+(?:question|query)|the\s+question))?\s*(?:[.:;,!…]+|$)\s*",
        r"^(?:नमस्ते|नमस्कार|प्रणाम)\s*(?:[,!.।:]+|$)\s*",
        r"^मैं\s+भारत\s+मित्र\s+हू[ँं]\s*(?:[,!.।:;]+|$)\s*",
        r"^आपके\s+(?:सवाल|प्रश्न)\s+का\s+(?:जवाब|उत्तर)\s+(?:यहाँ|यहां|यह)\s+है\s*(?:[,!.।:;…]+|$)\s*",
        r"^(?:धन्यवाद|शुक्रिया)\s*(?:[,!.।:]+|$)\s*",
    ]
    .into_iter()
    .filter_map(compile)
    .collect()
});

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(pattern, error = %e, "speech cleaning pattern failed to compile");
            None
        }
    }
}

/// Produce the text that should actually be spoken. Returns an empty string
/// when nothing speakable is left.
pub fn clean_for_speech(text: &str) -> String {
    let mut out = text.to_string();
    for (re, replacement) in MARKUP_RULES.iter() {
        out = re.replace_all(&out, *replacement).into_owned();
    }
    let mut out = collapse_whitespace(&out);

    loop {
        let trimmed = trim_punctuation(&out);
        let stripped = PREAMBLES
            .iter()
            .find_map(|re| re.find(trimmed).map(|m| trimmed[m.end()..].to_string()));
        match stripped {
            Some(rest) => out = rest,
            None => {
                out = trimmed.to_string();
                break;
            }
        }
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn trim_punctuation(text: &str) -> &str {
    text.trim_matches(is_edge_punctuation)
}

fn is_edge_punctuation(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '.' | ','
                | ';'
                | ':'
                | '!'
                | '?'
                | '।'
                | '॥'
                | '…'
                | '-'
                | '–'
                | '—'
                | '"'
                | '\''
                | '“'
                | '”'
                | '‘'
                | '’'
                | '*'
                | '_'
                | '~'
                | '`'
                | '|'
        )
}
