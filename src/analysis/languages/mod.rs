//! Language-specific analyzer implementations.

mod typescript;
mod vue;

pub use typescript::TypeScriptAnalyzer;
pub use vue::VueAnalyzer;

use lazy_static::lazy_static;

use super::ModuleAnalyzer;

lazy_static! {
    static ref TYPESCRIPT_ANALYZER: TypeScriptAnalyzer = TypeScriptAnalyzer::new();
    static ref VUE_ANALYZER: VueAnalyzer = VueAnalyzer::new();
}

/// Get an analyzer for the given file extension (without dot).
///
/// Returns None if no analyzer handles the extension.
pub fn get_analyzer(ext: &str) -> Option<&'static dyn ModuleAnalyzer> {
    match ext {
        "ts" | "tsx" | "js" | "jsx" | "mts" | "cts" => Some(&*TYPESCRIPT_ANALYZER),
        "vue" => Some(&*VUE_ANALYZER),
        _ => None,
    }
}

/// All file extensions with an analyzer.
pub fn registered_extensions() -> Vec<&'static str> {
    let mut extensions = TYPESCRIPT_ANALYZER.file_extensions().to_vec();
    extensions.extend_from_slice(VUE_ANALYZER.file_extensions());
    extensions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyzer_lookup() {
        assert_eq!(get_analyzer("tsx").map(|a| a.language_id()), Some("typescript"));
        assert_eq!(get_analyzer("jsx").map(|a| a.language_id()), Some("typescript"));
        assert_eq!(get_analyzer("vue").map(|a| a.language_id()), Some("vue"));
        assert!(get_analyzer("py").is_none());
    }

    #[test]
    fn test_registered_extensions() {
        let exts = registered_extensions();
        assert!(exts.contains(&"mts"));
        assert!(exts.contains(&"vue"));
    }
}
