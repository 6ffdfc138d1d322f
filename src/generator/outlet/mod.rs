use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{Config, ExportFormat, PdfConfig};
use crate::generator::types::FinalReport;

pub mod pdf;

/// 报告导出失败
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse report markdown: {0}")]
    Markdown(String),

    #[error("no usable font found (searched: {searched})")]
    FontNotFound { searched: String },

    #[error("failed to render PDF: {0}")]
    Render(String),

    #[error("export task failed: {0}")]
    Task(String),
}

/// 按配置的格式保存报告，返回写入的文件路径
pub async fn save(config: &Config, report: &FinalReport) -> Result<PathBuf, ExportError> {
    println!("\n🖊️ 报告存储中...");
    let output_file = config.output_file();

    if let Some(parent_dir) = output_file.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            tokio::fs::create_dir_all(parent_dir)
                .await
                .map_err(|source| ExportError::Io {
                    path: parent_dir.to_path_buf(),
                    source,
                })?;
        }
    }

    match config.export_format {
        ExportFormat::Markdown => MarkdownOutlet.save(report, &output_file).await?,
        ExportFormat::Pdf => {
            PdfOutlet::new(config.pdf.clone())
                .save(report, &output_file)
                .await?
        }
    }

    println!("💾 报告已保存: {}", output_file.display());
    Ok(output_file)
}

#[allow(async_fn_in_trait)]
pub trait Outlet {
    async fn save(&self, report: &FinalReport, path: &Path) -> Result<(), ExportError>;
}

/// 原样写出Markdown
pub struct MarkdownOutlet;

impl Outlet for MarkdownOutlet {
    async fn save(&self, report: &FinalReport, path: &Path) -> Result<(), ExportError> {
        tokio::fs::write(path, report.to_markdown())
            .await
            .map_err(|source| ExportError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// 将Markdown排版为PDF
pub struct PdfOutlet {
    config: PdfConfig,
}

impl PdfOutlet {
    pub fn new(config: PdfConfig) -> Self {
        Self { config }
    }
}

impl Outlet for PdfOutlet {
    async fn save(&self, report: &FinalReport, path: &Path) -> Result<(), ExportError> {
        let blocks = pdf::lower_markdown(&report.to_markdown())?;
        let title = report.title.clone();
        let config = self.config.clone();
        let path = path.to_path_buf();

        // 排版是同步的CPU密集操作
        tokio::task::spawn_blocking(move || pdf::render_pdf(&blocks, &title, &config, &path))
            .await
            .map_err(|e| ExportError::Task(e.to_string()))?
    }
}
