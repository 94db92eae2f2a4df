//! Response sanitizer — strips model-emitted internal monologue.
//!
//! Some local models wrap their reasoning in `<think>…</think>` spans inside
//! the textual content. Those spans are removed before text is returned to
//! the caller. The transcript keeps the raw text: stripping happens on final
//! emission only, so later turns still see whatever context the model relies
//! on.

use regex::Regex;
use std::sync::LazyLock;

static THINK_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"));

/// Clean assistant text for final emission.
///
/// Removes `<think>…</think>` spans, collapses runs of whitespace-only lines
/// into a single blank line, and trims leading/trailing whitespace.
/// Idempotent; non-ASCII content is preserved.
pub fn clean(text: &str) -> String {
    let stripped = THINK_SPAN.replace_all(text, "");

    // keep at most one blank line per run
    let mut lines: Vec<&str> = Vec::new();
    let mut prev_blank = false;
    for line in stripped.lines() {
        if line.trim().is_empty() {
            if !prev_blank && !lines.is_empty() {
                lines.push("");
            }
            prev_blank = true;
        } else {
            lines.push(line);
            prev_blank = false;
        }
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_think_span() {
        let text = "<think>the user wants weather</think>It is sunny in Tokyo.";
        assert_eq!(clean(text), "It is sunny in Tokyo.");
    }

    #[test]
    fn strips_multiline_think_span() {
        let text = "<think>\nstep 1\nstep 2\n</think>\nParis.";
        assert_eq!(clean(text), "Paris.");
    }

    #[test]
    fn strips_multiple_spans() {
        let text = "<think>a</think>Hello<think>b</think> world";
        assert_eq!(clean(text), "Hello world");
    }

    #[test]
    fn collapses_blank_lines() {
        let text = "line one\n\n\n   \nline two";
        assert_eq!(clean(text), "line one\n\nline two");
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(clean("  answer  \n"), "answer");
    }

    #[test]
    fn idempotent() {
        let inputs = [
            "<think>x</think>  Hello\n\n\nworld  ",
            "plain",
            "",
            "a\n\nb",
        ];
        for input in inputs {
            let once = clean(input);
            assert_eq!(clean(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn preserves_non_ascii() {
        assert_eq!(clean("<think>…</think>25°C, 東京は晴れ"), "25°C, 東京は晴れ");
    }

    #[test]
    fn think_only_text_cleans_to_empty() {
        assert_eq!(clean("<think>no answer yet</think>"), "");
    }

    #[test]
    fn unclosed_think_is_left_alone() {
        // Matches the original stripping behavior: only balanced spans go.
        assert_eq!(clean("<think>forever"), "<think>forever");
    }
}
