//! HTML正文提取
//!
//! 轻量的启发式提取：优先取 `<main>`/`<article>` 区域，剔除脚本、导航、页眉页脚等
//! 模板区块，解码常见实体，最后丢弃过短的菜单类文本行。

use regex::Regex;
use std::sync::LazyLock;

/// 整块剔除的标签
const BOILERPLATE_TAGS: &[&str] = &[
    "script", "style", "noscript", "svg", "nav", "header", "footer", "aside", "form", "iframe",
    "template",
];

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static BOILERPLATE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    BOILERPLATE_TAGS
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).unwrap())
        .collect()
});

static MAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<main\b[^>]*>(.*)</main\s*>").unwrap());

static ARTICLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<article\b[^>]*>(.*)</article\s*>").unwrap());

static BLOCK_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)</?(p|div|br|h[1-6]|li|tr|td|th|section|article|blockquote|pre|ul|ol|table|dd|dt)\b[^>]*>",
    )
    .unwrap()
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").unwrap());

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());

/// 从HTML中提取可读正文
pub fn extract_main_text(html: &str, min_line_chars: usize) -> String {
    let without_comments = COMMENT_RE.replace_all(html, "");

    let scoped = MAIN_RE
        .captures(&without_comments)
        .or_else(|| ARTICLE_RE.captures(&without_comments))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| without_comments.to_string());

    let mut content = scoped;
    for re in BOILERPLATE_RES.iter() {
        content = re.replace_all(&content, "\n").into_owned();
    }

    let with_breaks = BLOCK_TAG_RE.replace_all(&content, "\n");
    let stripped = TAG_RE.replace_all(&with_breaks, "");
    let decoded = decode_entities(&stripped);

    let mut lines: Vec<String> = Vec::new();
    for raw_line in decoded.lines() {
        let line = WHITESPACE_RE.replace_all(raw_line.trim(), " ").to_string();
        if line.is_empty() || !is_content_line(&line, min_line_chars) {
            continue;
        }
        if lines.last() == Some(&line) {
            continue;
        }
        lines.push(line);
    }

    lines.join("\n")
}

/// 判断是否为正文行：足够长，或以句末标点结尾
fn is_content_line(line: &str, min_line_chars: usize) -> bool {
    if line.chars().count() >= min_line_chars {
        return true;
    }
    line.ends_with(['.', '!', '?', '。', '！', '？'])
        && line.split_whitespace().count() >= 3
}

/// 解码常见HTML实体
pub fn decode_entities(text: &str) -> String {
    let numeric = NUMERIC_ENTITY_RE.replace_all(text, |caps: &regex::Captures| {
        let code = &caps[1];
        let parsed = match code.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        parsed
            .and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_default()
    });

    numeric
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&mdash;", "-")
        .replace("&ndash;", "-")
        .replace("&hellip;", "...")
        .replace("&amp;", "&")
}
