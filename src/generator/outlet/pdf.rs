//! Markdown到PDF的转换
//!
//! 先将Markdown解析为语法树并降级为扁平的 [`PdfBlock`] 列表，再交给genpdf排版。

use std::path::Path;
use std::sync::LazyLock;

use genpdf::elements::{Break, Paragraph};
use genpdf::fonts::{FontData, FontFamily};
use genpdf::style::{Style, StyledString};
use genpdf::{Alignment, Document, Element, Margins, SimplePageDecorator};
use markdown::mdast::Node;
use markdown::{ParseOptions, to_mdast};
use regex::Regex;

use super::ExportError;
use crate::config::{FontFiles, PdfConfig};

static BR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());

/// 可排版的块
#[derive(Debug, Clone, PartialEq)]
pub enum PdfBlock {
    Heading { level: u8, text: String },
    Paragraph(String),
    Bullet { depth: usize, text: String },
    Numbered { depth: usize, number: u32, text: String },
    Code(String),
    Quote(String),
    Rule,
    TableRow { cells: Vec<String>, header: bool },
}

/// 清理文本中PDF无法呈现的标记
pub fn sanitize_text(text: &str) -> String {
    let with_breaks = BR_RE.replace_all(text, "\n");
    let without_tags = TAG_RE.replace_all(&with_breaks, "");
    let plain = without_tags
        .replace("**", "")
        .replace("__", "")
        .replace('*', "")
        .replace('|', " ");

    plain
        .lines()
        .map(|line| SPACES_RE.replace_all(line.trim(), " ").into_owned())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// 将Markdown降级为排版块
pub fn lower_markdown(markdown: &str) -> Result<Vec<PdfBlock>, ExportError> {
    let root = to_mdast(markdown, &ParseOptions::gfm())
        .map_err(|e| ExportError::Markdown(e.to_string()))?;

    let mut blocks = Vec::new();
    lower_node(&root, 0, &mut blocks);
    Ok(blocks)
}

fn lower_node(node: &Node, depth: usize, blocks: &mut Vec<PdfBlock>) {
    match node {
        Node::Heading(heading) => {
            let text = sanitize_text(&inline_text(&heading.children));
            if !text.is_empty() {
                blocks.push(PdfBlock::Heading {
                    level: heading.depth,
                    text,
                });
            }
        }
        Node::Paragraph(paragraph) => {
            let text = sanitize_text(&inline_text(&paragraph.children));
            if !text.is_empty() {
                blocks.push(PdfBlock::Paragraph(text));
            }
        }
        Node::List(list) => {
            let start = list.start.unwrap_or(1);
            let items = list.children.iter().filter_map(|child| match child {
                Node::ListItem(item) => Some(item),
                _ => None,
            });

            for (i, item) in items.enumerate() {
                let mut text_parts = Vec::new();
                let mut nested = Vec::new();
                for child in &item.children {
                    match child {
                        Node::List(_) => nested.push(child),
                        other => text_parts.push(sanitize_text(&inline_text(std::slice::from_ref(other)))),
                    }
                }

                let text = text_parts
                    .into_iter()
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                if !text.is_empty() {
                    blocks.push(if list.ordered {
                        PdfBlock::Numbered {
                            depth,
                            number: start + i as u32,
                            text,
                        }
                    } else {
                        PdfBlock::Bullet { depth, text }
                    });
                }

                for nested_list in nested {
                    lower_node(nested_list, depth + 1, blocks);
                }
            }
        }
        Node::Code(code) => {
            if !code.value.trim().is_empty() {
                blocks.push(PdfBlock::Code(code.value.clone()));
            }
        }
        Node::ThematicBreak(_) => blocks.push(PdfBlock::Rule),
        Node::Table(table) => {
            for (i, row) in table.children.iter().enumerate() {
                if let Node::TableRow(row) = row {
                    let cells = row
                        .children
                        .iter()
                        .map(|cell| sanitize_text(&inline_text(std::slice::from_ref(cell))))
                        .collect();
                    blocks.push(PdfBlock::TableRow {
                        cells,
                        header: i == 0,
                    });
                }
            }
        }
        Node::Blockquote(quote) => {
            let text = sanitize_text(&inline_text(&quote.children));
            if !text.is_empty() {
                blocks.push(PdfBlock::Quote(text));
            }
        }
        Node::Html(html) => {
            let text = sanitize_text(&html.value);
            if !text.is_empty() {
                blocks.push(PdfBlock::Paragraph(text));
            }
        }
        other => {
            if let Some(children) = other.children() {
                for child in children {
                    lower_node(child, depth, blocks);
                }
            }
        }
    }
}

/// 拼接节点下的文字内容
fn inline_text(nodes: &[Node]) -> String {
    let mut text = String::new();
    for node in nodes {
        match node {
            Node::Text(t) => text.push_str(&t.value),
            Node::InlineCode(code) => text.push_str(&code.value),
            Node::Html(html) => text.push_str(&html.value),
            Node::Break(_) => text.push('\n'),
            Node::Image(image) => text.push_str(&image.alt),
            Node::Code(code) => {
                start_new_line(&mut text);
                text.push_str(&code.value);
            }
            Node::Paragraph(_) | Node::Heading(_) => {
                start_new_line(&mut text);
                if let Some(children) = node.children() {
                    text.push_str(&inline_text(children));
                }
            }
            other => {
                if let Some(children) = other.children() {
                    text.push_str(&inline_text(children));
                }
            }
        }
    }
    text
}

fn start_new_line(text: &mut String) {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
}

/// 按配置目录和候选字体依次查找，返回第一套四个字重都能加载的字体
fn load_font_family(config: &PdfConfig) -> Result<FontFamily<FontData>, ExportError> {
    let mut candidates = Vec::new();
    if let Some(dir) = &config.font_dir {
        candidates.push(FontFiles::family(dir.clone(), &config.font_family));
    }
    candidates.extend(config.fallback_fonts.iter().cloned());

    for files in &candidates {
        match load_font_files(files) {
            Ok(font_family) => {
                tracing::debug!(font = %files.regular_path().display(), "loaded PDF font");
                return Ok(font_family);
            }
            Err(e) => tracing::debug!(
                font = %files.regular_path().display(),
                error = %e,
                "font not usable"
            ),
        }
    }

    Err(ExportError::FontNotFound {
        searched: candidates
            .iter()
            .map(|files| files.regular_path().display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

fn load_font_files(files: &FontFiles) -> Result<FontFamily<FontData>, genpdf::error::Error> {
    let load = |name: &str| FontData::load(files.dir.join(name), None);
    Ok(FontFamily {
        regular: load(&files.regular)?,
        bold: load(&files.bold)?,
        italic: load(&files.italic)?,
        bold_italic: load(&files.bold_italic)?,
    })
}

fn indent(depth: usize) -> Margins {
    Margins::trbl(0, 0, 0, 6.0 * (depth as f64 + 1.0))
}

/// 排版并写出PDF
pub fn render_pdf(
    blocks: &[PdfBlock],
    title: &str,
    config: &PdfConfig,
    path: &Path,
) -> Result<(), ExportError> {
    let font_family = load_font_family(config)?;

    let mut doc = Document::new(font_family);
    doc.set_title(title);
    doc.set_font_size(config.font_size);

    let mut decorator = SimplePageDecorator::new();
    decorator.set_margins(20);
    doc.set_page_decorator(decorator);

    let base_size = config.font_size;

    for block in blocks {
        match block {
            PdfBlock::Heading { level: 1, text } => {
                let style = Style::new().bold().with_font_size(base_size + 8);
                doc.push(
                    Paragraph::new(StyledString::new(text.clone(), style))
                        .aligned(Alignment::Center),
                );
                doc.push(Break::new(1));
            }
            PdfBlock::Heading { level, text } => {
                let size = match level {
                    2 => base_size + 4,
                    3 => base_size + 2,
                    _ => base_size + 1,
                };
                doc.push(Break::new(0.5));
                doc.push(Paragraph::new(StyledString::new(
                    text.clone(),
                    Style::new().bold().with_font_size(size),
                )));
                doc.push(Break::new(0.3));
            }
            PdfBlock::Paragraph(text) => {
                for line in text.lines() {
                    doc.push(Paragraph::new(line.to_string()));
                }
                doc.push(Break::new(0.5));
            }
            PdfBlock::Bullet { depth, text } => {
                doc.push(Paragraph::new(format!("• {}", text)).padded(indent(*depth)));
            }
            PdfBlock::Numbered {
                depth,
                number,
                text,
            } => {
                doc.push(Paragraph::new(format!("{}. {}", number, text)).padded(indent(*depth)));
            }
            PdfBlock::Code(code) => {
                for line in code.lines() {
                    let style = Style::new().with_font_size(base_size.saturating_sub(1));
                    doc.push(
                        Paragraph::new(StyledString::new(line.to_string(), style))
                            .padded(indent(0)),
                    );
                }
                doc.push(Break::new(0.5));
            }
            PdfBlock::Quote(text) => {
                for line in text.lines() {
                    doc.push(
                        Paragraph::new(StyledString::new(line.to_string(), Style::new().italic()))
                            .padded(indent(0)),
                    );
                }
                doc.push(Break::new(0.5));
            }
            PdfBlock::Rule => doc.push(Break::new(1)),
            PdfBlock::TableRow { cells, header } => {
                let row = cells.join("   ");
                let style = if *header {
                    Style::new().bold()
                } else {
                    Style::new()
                };
                doc.push(Paragraph::new(StyledString::new(row, style)));
            }
        }
    }

    doc.render_to_file(path)
        .map_err(|e| ExportError::Render(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_text() {
        assert_eq!(
            sanitize_text("**Bold** and __under__ and *em*<br>next <span>line</span>"),
            "Bold and under and em\nnext line"
        );
        assert_eq!(sanitize_text("| a | b |"), "a b");
    }

    #[test]
    fn test_lower_headings_and_paragraphs() {
        let blocks =
            lower_markdown("# Report\n\n## Executive Summary\n\nRevenue **grew** 12%.\n").unwrap();

        assert_eq!(
            blocks,
            vec![
                PdfBlock::Heading {
                    level: 1,
                    text: "Report".to_string()
                },
                PdfBlock::Heading {
                    level: 2,
                    text: "Executive Summary".to_string()
                },
                PdfBlock::Paragraph("Revenue grew 12%.".to_string()),
            ]
        );
    }

    #[test]
    fn test_lower_lists() {
        let blocks = lower_markdown("- Strength one\n  - detail\n- Strength *two*\n\n3. third\n4. fourth\n").unwrap();

        assert_eq!(
            blocks,
            vec![
                PdfBlock::Bullet {
                    depth: 0,
                    text: "Strength one".to_string()
                },
                PdfBlock::Bullet {
                    depth: 1,
                    text: "detail".to_string()
                },
                PdfBlock::Bullet {
                    depth: 0,
                    text: "Strength two".to_string()
                },
                PdfBlock::Numbered {
                    depth: 0,
                    number: 3,
                    text: "third".to_string()
                },
                PdfBlock::Numbered {
                    depth: 0,
                    number: 4,
                    text: "fourth".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_lower_table_and_rule() {
        let blocks = lower_markdown("| Year | Value |\n| --- | --- |\n| 2025 | 500 |\n\n---\n").unwrap();

        assert_eq!(
            blocks,
            vec![
                PdfBlock::TableRow {
                    cells: vec!["Year".to_string(), "Value".to_string()],
                    header: true
                },
                PdfBlock::TableRow {
                    cells: vec!["2025".to_string(), "500".to_string()],
                    header: false
                },
                PdfBlock::Rule,
            ]
        );
    }

    #[test]
    fn test_lower_inline_html_breaks() {
        let blocks = lower_markdown("First line<br>Second line\n").unwrap();

        assert_eq!(
            blocks,
            vec![PdfBlock::Paragraph("First line\nSecond line".to_string())]
        );
    }

    #[test]
    fn test_lower_code_block() {
        let blocks = lower_markdown("```mermaid\nmindmap\n  (Root)\n```\n").unwrap();

        assert_eq!(blocks, vec![PdfBlock::Code("mindmap\n  (Root)".to_string())]);
    }

    #[test]
    fn test_missing_fonts_reported() {
        let config = PdfConfig {
            font_dir: Some("/definitely/not/a/font/dir".into()),
            fallback_fonts: vec![],
            ..Default::default()
        };

        let err = load_font_family(&config).unwrap_err();
        assert!(
            err.to_string()
                .contains("/definitely/not/a/font/dir/LiberationSans-Regular.ttf")
        );
    }

    /// 宿主机上任意一个可用的TTF字体文件
    fn system_font() -> Option<PathBuf> {
        let mut candidates: Vec<PathBuf> = PdfConfig::default()
            .fallback_fonts
            .iter()
            .map(|files| files.regular_path())
            .collect();
        candidates.push(PathBuf::from(
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
        ));
        candidates.into_iter().find(|path| path.is_file())
    }

    /// 把同一个字体文件按给定命名复制四份
    fn stage_font(font: &Path, files: &FontFiles) {
        for name in [&files.regular, &files.bold, &files.italic, &files.bold_italic] {
            std::fs::copy(font, files.dir.join(name)).unwrap();
        }
    }

    #[test]
    fn test_load_dejavu_style_file_names() {
        let Some(font) = system_font() else {
            eprintln!("skipping: no system TTF font available");
            return;
        };
        let temp_dir = TempDir::new().unwrap();
        let files = FontFiles::dejavu(temp_dir.path());
        stage_font(&font, &files);

        let config = PdfConfig {
            font_dir: None,
            fallback_fonts: vec![
                FontFiles::family(temp_dir.path().join("missing"), "LiberationSans"),
                files,
            ],
            ..Default::default()
        };

        assert!(load_font_family(&config).is_ok());
    }

    #[test]
    fn test_default_fallbacks_load_installed_dejavu() {
        let dejavu = FontFiles::dejavu("/usr/share/fonts/truetype/dejavu");
        let installed = [&dejavu.regular, &dejavu.bold, &dejavu.italic, &dejavu.bold_italic]
            .iter()
            .all(|name| dejavu.dir.join(name).is_file());
        if !installed {
            eprintln!("skipping: DejaVu fonts are not installed");
            return;
        }

        assert!(load_font_family(&PdfConfig::default()).is_ok());
    }

    #[test]
    fn test_render_pdf_writes_document() {
        let Some(font) = system_font() else {
            eprintln!("skipping: no system TTF font available");
            return;
        };
        let temp_dir = TempDir::new().unwrap();
        stage_font(&font, &FontFiles::family(temp_dir.path(), "PegasusSans"));

        let config = PdfConfig {
            font_dir: Some(temp_dir.path().to_path_buf()),
            font_family: "PegasusSans".to_string(),
            fallback_fonts: vec![],
            ..Default::default()
        };
        let blocks = lower_markdown(
            "# Pegasus Intelligence Report: Widgets\n\n\
             *Generated on 2026-10-17*\n\n\
             ## SWOT Analysis\n\n\
             Demand is **strong** [1].\n\n\
             - Strength one\n  - detail\n\n\
             1. First step\n\n\
             > Analysts agree.\n\n\
             | Region | Share |\n| --- | --- |\n| EU | 40 |\n\n\
             ---\n\n\
             ```mermaid\nmindmap\n  (Widgets)\n```\n",
        )
        .unwrap();
        let path = temp_dir.path().join("report.pdf");

        render_pdf(&blocks, "Widgets", &config, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
