//! Content analysis for captured text
//!
//! Derives the system tags (`url`, `email`, `phone`, `path`, `json`,
//! `markdown`, `code`, `code:<lang>`) that the type filter classifies on.

use once_cell::sync::Lazy;
use regex::Regex;

/// Tags the analyzer can emit, excluding the `code:<lang>` family.
pub const SYSTEM_TAGS: &[&str] = &["url", "email", "phone", "path", "json", "markdown", "code"];

static URL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://\S+$").expect("url regex"));

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email regex")
});

static PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+\d]?[\d\s\-()]+$").expect("phone regex"));

static PATH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]:[\\/]|^[/~]").expect("path regex"));

static MARKDOWN_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        r"^#{1,6}\s",
        r"\*\*[^*]+\*\*",
        r"\*[^*]+\*",
        r"\[.+\]\(.+\)",
        r"^[*\-]\s",
        r"```",
    ])
});

static CODE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile_all(&[
        r"(function|const|let|var|class|def|import|export)",
        r"(if|else|for|while|return)",
        r"[{}\[\]();]",
        r"(public|private|protected|static)",
    ])
});

static LANGUAGE_PATTERNS: Lazy<Vec<(&'static str, Vec<Regex>)>> = Lazy::new(|| {
    vec![
        (
            "rust",
            compile_all(&[r"fn\s+\w+", r"let\s+mut", r"impl\s+", r"use\s+\w+::"]),
        ),
        (
            "javascript",
            compile_all(&[
                r"const\s+\w+\s*=",
                r"=>\s*\{",
                r"function\s+\w+\(",
                r"\.then\(",
            ]),
        ),
        (
            "typescript",
            compile_all(&[
                r":\s*(string|number|boolean)",
                r"interface\s+\w+",
                r"type\s+\w+\s*=",
            ]),
        ),
        (
            "python",
            compile_all(&[r"def\s+\w+\(", r"import\s+\w+", r":\s*$", r"if\s+__name__"]),
        ),
        (
            "java",
            compile_all(&[
                r"public\s+class",
                r"private\s+\w+",
                r"@Override",
                r"new\s+\w+\(",
            ]),
        ),
        (
            "go",
            compile_all(&[r"func\s+\w+\(", r"package\s+\w+", r":=", r"go\s+func"]),
        ),
        (
            "cpp",
            compile_all(&[r"#include\s*<", r"std::", r"nullptr", r"template\s*<"]),
        ),
        (
            "csharp",
            compile_all(&[r"using\s+System", r"namespace\s+\w+", r"public\s+override"]),
        ),
    ]
});

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("static analyzer pattern"))
        .collect()
}

/// Returns the system tags for `content`, in a fixed order.
pub fn analyze(content: &str) -> Vec<String> {
    let mut tags = Vec::new();
    if is_url(content) {
        tags.push("url".to_string());
    }
    if is_email(content) {
        tags.push("email".to_string());
    }
    if is_phone(content) {
        tags.push("phone".to_string());
    }
    if is_file_path(content) {
        tags.push("path".to_string());
    }
    if is_json(content) {
        tags.push("json".to_string());
    }
    if is_markdown(content) {
        tags.push("markdown".to_string());
    }
    if is_code(content) {
        tags.push("code".to_string());
        if let Some(lang) = detect_language(content) {
            tags.push(format!("code:{lang}"));
        }
    }
    tags
}

pub fn is_system_tag(name: &str) -> bool {
    SYSTEM_TAGS.contains(&name) || name.starts_with("code:")
}

fn is_url(content: &str) -> bool {
    URL_REGEX.is_match(content.trim())
}

fn is_email(content: &str) -> bool {
    EMAIL_REGEX.is_match(content.trim())
}

fn is_phone(content: &str) -> bool {
    let trimmed = content.trim();
    PHONE_REGEX.is_match(trimmed) && trimmed.chars().filter(|c| c.is_ascii_digit()).count() >= 7
}

fn is_file_path(content: &str) -> bool {
    PATH_REGEX.is_match(content.trim())
}

fn is_json(content: &str) -> bool {
    let t = content.trim();
    (t.starts_with('{') && t.ends_with('}')) || (t.starts_with('[') && t.ends_with(']'))
}

fn is_markdown(content: &str) -> bool {
    MARKDOWN_PATTERNS.iter().any(|re| re.is_match(content))
}

fn is_code(content: &str) -> bool {
    CODE_PATTERNS.iter().filter(|re| re.is_match(content)).count() >= 2
}

fn detect_language(content: &str) -> Option<&'static str> {
    LANGUAGE_PATTERNS
        .iter()
        .find(|(_, patterns)| patterns.iter().filter(|re| re.is_match(content)).count() >= 2)
        .map(|(lang, _)| *lang)
}
