//! Output file naming

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

use crate::core::models::{ConfigurationOption, ExportFormat};

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_\s-]").expect("valid slug pattern"));
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s]+").expect("valid separator pattern"));

/// Lower-case ASCII slug: accents folded, punctuation dropped, runs of
/// whitespace and hyphens collapsed to a single hyphen.
pub fn slugify(value: &str) -> String {
    let ascii: String = value.nfkd().filter(char::is_ascii).collect();
    let lowered = ascii.to_lowercase();
    let cleaned = DISALLOWED.replace_all(&lowered, "");
    let joined = SEPARATORS.replace_all(&cleaned, "-");
    joined.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// File stem shared by every result of one (part studio, configuration) export
pub fn output_stem(part_studio_name: &str, configuration: &ConfigurationOption) -> String {
    let mut names = Vec::with_capacity(2);
    if part_studio_name.is_empty() {
        names.push(configuration.display_name.as_str());
    } else {
        names.push(part_studio_name);
        if !configuration.display_name.is_empty() && !configuration.is_default() {
            names.push(configuration.display_name.as_str());
        }
    }

    names
        .into_iter()
        .map(slugify)
        .collect::<Vec<_>>()
        .join("-")
}

/// `<stem>[_<index>].<ext>`; `index` is 1-based and only given for multi-file results
pub fn output_file_name(stem: &str, index: Option<usize>, format: &ExportFormat) -> String {
    match index {
        Some(index) => format!("{}_{}.{}", stem, index, format.extension()),
        None => format!("{}.{}", stem, format.extension()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Bracket Assembly"), "bracket-assembly");
        assert_eq!(slugify("  M3 x 10mm (ISO) "), "m3-x-10mm-iso");
        assert_eq!(slugify("Size - Large"), "size-large");
        assert_eq!(slugify("Café Crème"), "cafe-creme");
        assert_eq!(slugify("__under_score--"), "under_score");
        assert_eq!(slugify("日本"), "");
    }

    #[test]
    fn test_stem_for_default_configuration() {
        let stem = output_stem("Part Studio 1", &ConfigurationOption::default_configuration());
        assert_eq!(stem, "part-studio-1");
    }

    #[test]
    fn test_stem_for_named_configuration() {
        let config = ConfigurationOption::new("configuration=x", "Length - 20 mm");
        assert_eq!(output_stem("Rail", &config), "rail-length-20-mm");
    }

    #[test]
    fn test_stem_without_part_studio_name() {
        let config = ConfigurationOption::new("configuration=x", "Large");
        assert_eq!(output_stem("", &config), "large");
    }

    #[test]
    fn test_file_names() {
        let format = ExportFormat::new("STEP");
        assert_eq!(output_file_name("rail", None, &format), "rail.step");
        assert_eq!(output_file_name("rail", Some(2), &format), "rail_2.step");
    }
}
