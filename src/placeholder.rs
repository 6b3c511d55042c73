//! Substitution of Qt-style place markers in translated text.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::OnceLock;

fn count_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"%L?n").expect("count marker pattern"))
}

fn arg_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"%L?([1-9][0-9]?)").expect("argument marker pattern"))
}

/// Replaces `%n` (and the localized `%Ln`) with `n`.
pub fn substitute_count(text: &str, n: u64) -> Cow<'_, str> {
    count_marker().replace_all(text, n.to_string().as_str())
}

/// Replaces `%1` through `%99` with the matching argument.
///
/// Markers past the end of `args` are left as they are, and substituted text
/// is never scanned again.
pub fn substitute_args<'a, S: AsRef<str>>(text: &'a str, args: &[S]) -> Cow<'a, str> {
    arg_marker().replace_all(text, |caps: &Captures<'_>| {
        let whole = &caps[0];
        caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|i| args.get(i - 1))
            .map_or_else(|| whole.to_owned(), |arg| arg.as_ref().to_owned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("%n מעבדים", 4, "4 מעבדים")]
    #[case("%Ln files", 2, "2 files")]
    #[case("no marker", 3, "no marker")]
    #[case("%n of %n", 7, "7 of 7")]
    fn replaces_count(#[case] text: &str, #[case] n: u64, #[case] expected: &str) {
        assert_eq!(substitute_count(text, n), expected);
    }

    #[test]
    fn replaces_numbered_arguments() {
        let text = "<b>%1</b> של %2";
        assert_eq!(substitute_args(text, &["Ubuntu", "VirtualBox"]), "<b>Ubuntu</b> של VirtualBox");
    }

    #[test]
    fn leaves_missing_arguments() {
        assert_eq!(substitute_args("%1 and %3", &["one"]), "one and %3");
    }

    #[test]
    fn does_not_substitute_recursively() {
        assert_eq!(substitute_args("%1 %2", &["%2", "x"]), "%2 x");
    }

    #[test]
    fn handles_two_digit_markers() {
        let args: Vec<String> = (1..=12).map(|i| format!("a{}", i)).collect();
        assert_eq!(substitute_args("%12-%1", &args), "a12-a1");
    }

    #[test]
    fn untouched_text_is_borrowed() {
        assert!(matches!(substitute_args("plain", &["x"]), Cow::Borrowed(_)));
    }
}
