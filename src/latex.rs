// src/latex.rs
//! LaTeX-to-PDF compilation pipeline.
//!
//! Content is compiled in a throwaway workspace (template directories
//! are copied in so `\input` sections resolve), `pdflatex` runs twice to
//! settle references, and the resulting PDF lands in the documents
//! directory.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

pub struct LatexCompiler {
    documents_dir: PathBuf,
    timeout: Duration,
}

impl LatexCompiler {
    pub fn new(documents_dir: PathBuf, timeout_seconds: u64) -> Self {
        Self {
            documents_dir,
            timeout: Duration::from_secs(timeout_seconds),
        }
    }

    /// Compile `content` into `<documents_dir>/<filename>.pdf`. When a
    /// template directory is given, its files are copied into the
    /// workspace first.
    pub async fn compile(
        &self,
        content: &str,
        filename: &str,
        template_dir: Option<&Path>,
    ) -> Result<PathBuf> {
        if !validate_latex_content(content) {
            anyhow::bail!(
                "Content is not a complete LaTeX document (missing \\documentclass or document environment)"
            );
        }

        tokio::fs::create_dir_all(&self.documents_dir)
            .await
            .context("Failed to create documents directory")?;

        let workspace = tempfile::tempdir().context("Failed to create compilation workspace")?;
        let tex_path = workspace.path().join(format!("{}.tex", filename));
        tokio::fs::write(&tex_path, content)
            .await
            .context("Failed to write LaTeX source")?;

        if let Some(dir) = template_dir {
            copy_tree(dir, workspace.path()).await?;
        }

        for run in 1..=2 {
            self.run_pdflatex(workspace.path(), &tex_path, run).await?;
        }

        let pdf_path = workspace.path().join(format!("{}.pdf", filename));
        if !pdf_path.exists() {
            anyhow::bail!("pdflatex reported success but produced no PDF");
        }

        let final_path = self.documents_dir.join(format!("{}.pdf", filename));
        tokio::fs::copy(&pdf_path, &final_path)
            .await
            .context("Failed to copy PDF to documents directory")?;

        info!("Compiled {} to {}", filename, final_path.display());
        Ok(final_path)
    }

    async fn run_pdflatex(&self, workspace: &Path, tex_path: &Path, run: u32) -> Result<()> {
        let output = tokio::time::timeout(
            self.timeout,
            Command::new("pdflatex")
                .arg("-interaction=nonstopmode")
                .arg("-output-directory")
                .arg(workspace)
                .arg(tex_path)
                .current_dir(workspace)
                .output(),
        )
        .await
        .map_err(|_| anyhow::anyhow!("LaTeX compilation timed out"))?
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::anyhow!("pdflatex not found. Ensure LaTeX is installed and on PATH")
            } else {
                anyhow::anyhow!("Failed to execute pdflatex: {}", e)
            }
        })?;

        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            warn!("pdflatex run {} failed", run);
            anyhow::bail!(
                "LaTeX compilation failed (run {}): {}",
                run,
                last_lines(&stdout, 20)
            );
        }
        Ok(())
    }
}

async fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    let mut pending = vec![from.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .with_context(|| format!("Failed to read template directory: {}", dir.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let relative = path
                .strip_prefix(from)
                .context("Template entry outside template root")?;
            let target = to.join(relative);
            if path.is_dir() {
                tokio::fs::create_dir_all(&target).await?;
                pending.push(path);
            } else {
                if let Some(parent) = target.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::copy(&path, &target).await.with_context(|| {
                    format!("Failed to copy template file: {}", path.display())
                })?;
            }
        }
    }
    Ok(())
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

/// Quick sanity check before spending a pdflatex run.
pub fn validate_latex_content(content: &str) -> bool {
    if content.trim().is_empty() {
        return false;
    }
    let lower = content.to_lowercase();
    ["\\documentclass", "\\begin{document}", "\\end{document}"]
        .iter()
        .all(|needle| lower.contains(needle))
}

/// Replace `{{PLACEHOLDER}}` markers with their values. Keys are the
/// bare placeholder names.
pub fn apply_replacements(content: &str, replacements: &HashMap<&str, String>) -> String {
    let mut result = content.to_string();
    for (placeholder, value) in replacements {
        result = result.replace(&format!("{{{{{}}}}}", placeholder), value);
    }
    result
}

/// Strip characters unsafe for file names, collapse spaces to
/// underscores, never return an empty name.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            ' ' => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_').to_string();
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_latex_content() {
        let good = "\\documentclass{article}\n\\begin{document}Hi\\end{document}";
        assert!(validate_latex_content(good));
        assert!(!validate_latex_content("Hello"));
        assert!(!validate_latex_content(""));
        assert!(!validate_latex_content("\\documentclass{article}"));
    }

    #[test]
    fn test_apply_replacements() {
        let mut replacements = HashMap::new();
        replacements.insert("NAME", "Jane Doe".to_string());
        replacements.insert("COMPANY", "Acme".to_string());
        let result = apply_replacements("Dear {{COMPANY}}, I am {{NAME}}. -{{NAME}}", &replacements);
        assert_eq!(result, "Dear Acme, I am Jane Doe. -Jane Doe");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Acme/Engineer CV"), "Acme_Engineer_CV");
        assert_eq!(sanitize_filename("a<b>:c"), "a_b__c");
        assert_eq!(sanitize_filename("..."), "untitled");
        assert_eq!(sanitize_filename(""), "untitled");
    }

    #[tokio::test]
    async fn test_compile_rejects_incomplete_document() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = LatexCompiler::new(dir.path().to_path_buf(), 5);
        let err = compiler
            .compile("not latex", "out", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a complete LaTeX document"));
    }

    #[tokio::test]
    async fn test_copy_tree_preserves_layout() {
        let from = tempfile::tempdir().unwrap();
        let to = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(from.path().join("sections"))
            .await
            .unwrap();
        tokio::fs::write(from.path().join("main.tex"), "x")
            .await
            .unwrap();
        tokio::fs::write(from.path().join("sections/intro.tex"), "y")
            .await
            .unwrap();

        copy_tree(from.path(), to.path()).await.unwrap();
        assert!(to.path().join("main.tex").exists());
        assert!(to.path().join("sections/intro.tex").exists());
    }
}
