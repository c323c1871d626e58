//! Extraction of summary/prompt pairs from free-form model output.
//!
//! Models are told to answer with a fixed `Summary N:` / `Prompt N:` template
//! but routinely add markdown emphasis, drop or repeat the numbers, wrap values
//! in quotes, or chat before and after the pairs. Summaries and prompts are
//! collected independently and then paired by position: the i-th summary goes
//! with the i-th prompt whatever digits the labels carry.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::PromptPair;

/// Number of pairs the model is asked for; consumers keep at most this many.
pub const TARGET_PAIRS: usize = 3;

static EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[*_]+").expect("valid emphasis pattern"));

// Optional list marker, the label word, an optional one- or two-digit number,
// an optional colon, then the remainder of the line. Numbers past 3 are
// accepted so extra numbered pairs behave like extra unnumbered ones.
static LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:[-•>#]+\s*|\d+[.)]\s+)?(summary|prompt)\s*(\d{1,2})?\s*(:)?(.*)$")
        .expect("valid label pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LabelKind {
    Summary,
    Prompt,
}

struct Label<'a> {
    kind: LabelKind,
    rest: &'a str,
}

/// A label needs a digit or a colon after the word, so prose such as
/// "Prompts like these..." is not mistaken for one.
fn match_label(line: &str) -> Option<Label<'_>> {
    let caps = LABEL.captures(line.trim_start())?;
    if caps.get(2).is_none() && caps.get(3).is_none() {
        return None;
    }
    let kind = if caps[1].eq_ignore_ascii_case("summary") {
        LabelKind::Summary
    } else {
        LabelKind::Prompt
    };
    let rest = caps.get(4).map(|m| m.as_str()).unwrap_or_default();
    Some(Label { kind, rest })
}

fn is_continuation(line: &str) -> bool {
    line.starts_with(char::is_whitespace) && match_label(line).is_none()
}

const QUOTE_PAIRS: &[(char, char)] = &[
    ('"', '"'),
    ('“', '”'),
    ('„', '“'),
    ('\'', '\''),
    ('‘', '’'),
    ('«', '»'),
];

/// Remove quote pairs that wrap the whole value, outermost first. A pair only
/// counts when its closing mark does not also appear inside, so
/// `"Aha" and "Oho"` keeps its quotes.
fn strip_wrapping_quotes(value: &str) -> String {
    let mut value = value.trim();
    loop {
        let mut chars = value.chars();
        let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
            break;
        };
        let inner = chars.as_str();
        let wraps = QUOTE_PAIRS
            .iter()
            .any(|&(open, close)| first == open && last == close && !inner.contains(close));
        if !wraps {
            break;
        }
        value = inner.trim();
    }
    value.to_string()
}

/// Parse raw model text into pairs in emission order.
///
/// Never fails: unparseable input yields an empty vector. More than
/// [`TARGET_PAIRS`] pairs are returned as found; clamping is up to the caller.
pub fn parse_prompt_pairs(raw: &str) -> Vec<PromptPair> {
    let cleaned = EMPHASIS.replace_all(raw, "");
    let lines: Vec<&str> = cleaned.trim().lines().collect();

    let mut summaries: Vec<String> = Vec::new();
    let mut prompts: Vec<String> = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let Some(label) = match_label(lines[i]) else {
            i += 1;
            continue;
        };
        i += 1;

        // A label with nothing after it takes its value from the next
        // non-blank, unlabeled line.
        let mut first = label.rest.trim().trim_start_matches(':').trim().to_string();
        if first.is_empty() {
            let mut j = i;
            while j < lines.len() && lines[j].trim().is_empty() {
                j += 1;
            }
            if j < lines.len() && match_label(lines[j]).is_none() {
                first = lines[j].trim().to_string();
                i = j + 1;
            }
        }

        match label.kind {
            LabelKind::Summary => summaries.push(strip_wrapping_quotes(&first)),
            LabelKind::Prompt => {
                let mut body = vec![first];
                while i < lines.len() {
                    let line = lines[i];
                    if line.trim().is_empty() {
                        body.push(String::new());
                    } else if is_continuation(line) {
                        body.push(line.trim().to_string());
                    } else {
                        break;
                    }
                    i += 1;
                }
                prompts.push(strip_wrapping_quotes(&body.join("\n")));
            }
        }
    }

    summaries
        .into_iter()
        .zip(prompts)
        .filter(|(summary, prompt)| !summary.is_empty() && !prompt.is_empty())
        .map(|(summary, prompt)| PromptPair { summary, prompt })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = "Summary 1: Bold minimal skyline\nPrompt 1: A minimalist skyline...\nSummary 2: Quiet morning desk\nPrompt 2: A single coffee cup...\nSummary 3: Networked handshake\nPrompt 3: Two silhouettes shaking hands...";

    #[test]
    fn well_formed_template_yields_three_pairs_in_order() {
        let pairs = parse_prompt_pairs(WELL_FORMED);
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].summary, "Bold minimal skyline");
        assert_eq!(pairs[0].prompt, "A minimalist skyline...");
        assert_eq!(pairs[1].summary, "Quiet morning desk");
        assert_eq!(pairs[2].prompt, "Two silhouettes shaking hands...");
    }

    #[test]
    fn reparsing_a_prompt_body_yields_nothing() {
        let pairs = parse_prompt_pairs(WELL_FORMED);
        for pair in &pairs {
            assert!(parse_prompt_pairs(&pair.prompt).is_empty());
        }
    }

    #[test]
    fn labels_without_digits_still_pair() {
        let text = "Summary: First idea\nPrompt: first body\nSummary: Second idea\nPrompt: second body\nSummary: Third idea\nPrompt: third body";
        let pairs = parse_prompt_pairs(text);
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].summary, "First idea");
        assert_eq!(pairs[2].prompt, "third body");
    }

    #[test]
    fn wrapping_quotes_are_stripped() {
        let text = "Summary 1: \"“Bold minimal skyline”\"\nPrompt 1: “A skyline at dusk”";
        let pairs = parse_prompt_pairs(text);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].summary, "Bold minimal skyline");
        assert_eq!(pairs[0].prompt, "A skyline at dusk");
    }

    #[test]
    fn quotes_inside_values_survive() {
        let text = "Summary 1: Say \"cheese\"\nPrompt 1: A neon sign reading \"OPEN\"\n\
                    Summary 2: \"Aha\" moment\nPrompt 2: \"Golden hour\" light over a desk\n\
                    Summary 3: \"Aha\" and \"Oho\"\nPrompt 3: 'Don't stop' poster";
        let pairs = parse_prompt_pairs(text);
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].summary, "Say \"cheese\"");
        assert_eq!(pairs[0].prompt, "A neon sign reading \"OPEN\"");
        assert_eq!(pairs[1].summary, "\"Aha\" moment");
        assert_eq!(pairs[1].prompt, "\"Golden hour\" light over a desk");
        assert_eq!(pairs[2].summary, "\"Aha\" and \"Oho\"");
        assert_eq!(pairs[2].prompt, "'Don't stop' poster");
    }

    #[test]
    fn nested_and_single_wrapping_quotes_are_stripped() {
        assert_eq!(strip_wrapping_quotes(" \"“x”\" "), "x");
        assert_eq!(strip_wrapping_quotes("'quiet desk'"), "quiet desk");
        assert_eq!(strip_wrapping_quotes("‘soft light’"), "soft light");
        assert_eq!(strip_wrapping_quotes("«calm»"), "calm");
        assert_eq!(strip_wrapping_quotes("\"unbalanced"), "\"unbalanced");
        assert_eq!(strip_wrapping_quotes("\""), "\"");
    }

    #[test]
    fn dangling_summary_is_dropped() {
        let text = "Summary 1: One\nPrompt 1: body one\nSummary 2: Two\nPrompt 2: body two\nSummary 3: Three without a prompt";
        let pairs = parse_prompt_pairs(text);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].summary, "Two");
    }

    #[test]
    fn pairing_ignores_digit_mismatch() {
        let text = "Summary 2: Alpha\nPrompt 3: alpha body\nSummary 1: Beta\nPrompt 1: beta body";
        let pairs = parse_prompt_pairs(text);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].summary, "Alpha");
        assert_eq!(pairs[0].prompt, "alpha body");
        assert_eq!(pairs[1].summary, "Beta");
    }

    #[test]
    fn markdown_emphasis_and_casing_are_tolerated() {
        let text = "**SUMMARY 1:** _Neon city_\n**prompt 1:** A *glowing* street";
        let pairs = parse_prompt_pairs(text);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].summary, "Neon city");
        assert_eq!(pairs[0].prompt, "A glowing street");
    }

    #[test]
    fn prompt_body_spans_indented_lines_and_blank_lines() {
        let text = "Summary 1: Layered body\nPrompt 1: First line\n  second line\n\n  after a blank line\nSummary 2: Next\nPrompt 2: next body";
        let pairs = parse_prompt_pairs(text);
        assert_eq!(pairs.len(), 2);
        assert_eq!(
            pairs[0].prompt,
            "First line\nsecond line\n\nafter a blank line"
        );
        assert_eq!(pairs[1].prompt, "next body");
    }

    #[test]
    fn commentary_around_pairs_is_ignored() {
        let text = format!(
            "Sure! Here are your pairs.\n\n{WELL_FORMED}\n\nLet me know if you want variations."
        );
        let pairs = parse_prompt_pairs(&text);
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[2].prompt, "Two silhouettes shaking hands...");
    }

    #[test]
    fn value_on_following_line_is_picked_up() {
        let text = "Summary 1:\nSunlit desk\nPrompt 1:\nA desk bathed in light";
        let pairs = parse_prompt_pairs(text);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].summary, "Sunlit desk");
        assert_eq!(pairs[0].prompt, "A desk bathed in light");
    }

    #[test]
    fn prose_mentioning_prompts_is_not_a_label() {
        let text = "Prompts like these work well.\nSummary 1: Real one\nPrompt 1: real body";
        let pairs = parse_prompt_pairs(text);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].summary, "Real one");
    }

    #[test]
    fn more_than_three_pairs_are_all_returned() {
        let text = (1..=4)
            .map(|n| format!("Summary: idea {n}\nPrompt: body {n}"))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(parse_prompt_pairs(&text).len(), 4);
    }

    #[test]
    fn numbered_pairs_past_three_are_returned_too() {
        let text = (1..=4)
            .map(|n| format!("Summary {n}: idea {n}\nPrompt {n}: body {n}"))
            .collect::<Vec<_>>()
            .join("\n");
        let pairs = parse_prompt_pairs(&text);
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[3].summary, "idea 4");
        assert_eq!(pairs[3].prompt, "body 4");
    }

    #[test]
    fn garbage_yields_empty() {
        assert!(parse_prompt_pairs("").is_empty());
        assert!(parse_prompt_pairs("I cannot help with that.").is_empty());
        assert!(parse_prompt_pairs("Summary 1: lonely").is_empty());
    }
}
