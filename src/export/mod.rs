pub mod excel;

use std::path::{Path, PathBuf};

/// A directory (or an extension-less path) gets `<title>.xlsx` inside it
pub fn output_path_for(output: &Path, title: &str) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(format!("{}.xlsx", sanitize_file_name(title)))
    } else {
        output.to_path_buf()
    }
}

fn sanitize_file_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "cost-sheet".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_output_path_for_directory() {
        let dir = tempdir().unwrap();
        let path = output_path_for(dir.path(), "Sheet 12 Bayside/Marina");
        assert_eq!(path, dir.path().join("Sheet 12 Bayside_Marina.xlsx"));
    }

    #[test]
    fn test_output_path_for_file() {
        let path = output_path_for(Path::new("out/quote.xlsx"), "ignored");
        assert_eq!(path, PathBuf::from("out/quote.xlsx"));
    }

    #[test]
    fn test_blank_title_falls_back() {
        let path = output_path_for(Path::new("out"), "  ");
        assert_eq!(path, PathBuf::from("out/cost-sheet.xlsx"));
    }
}
