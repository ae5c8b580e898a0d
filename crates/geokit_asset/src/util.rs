use std::collections::BTreeMap;
use std::sync::LazyLock;

use any_ascii::any_ascii;
use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;

use crate::conf::{
    C_ASSETS_ROOT, C_PROJECTS_ROOT, C_SEPARATOR, N_LEN_DESCRIPTION_MAX,
    TUP_DESCRIPTION_REPLACEMENTS,
};
use crate::path::AssetPath;
use crate::spec::AssetTreeError;

////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

/// Split an identifier into its non-empty components.
///
/// Leading, trailing and repeated separators collapse; `.` components are
/// dropped the same way a posix path drops them.
pub(crate) fn split_components(value: &str) -> Vec<String> {
    value
        .split(C_SEPARATOR)
        .filter(|part| !part.is_empty() && *part != ".")
        .map(str::to_string)
        .collect()
}

/// `true` for the namespace prefixes that are never real folders:
/// `""`, `projects`, `projects/<owner>` and `projects/<owner>/assets`.
pub(crate) fn is_scaffolding(parts: &[String]) -> bool {
    match parts {
        [] => true,
        [root] => root == C_PROJECTS_ROOT,
        [root, _] => root == C_PROJECTS_ROOT,
        [root, _, assets] => root == C_PROJECTS_ROOT && assets == C_ASSETS_ROOT,
        _ => false,
    }
}

/// `true` when one path contains the other (or both are equal).
pub(crate) fn is_overlap(path_src: &AssetPath, path_dst: &AssetPath) -> bool {
    path_dst.is_relative_to(path_src) || path_src.is_relative_to(path_dst)
}

/// Order paths for bottom-up deletion: deepest level first, levels keep
/// their listing order.
pub(crate) fn order_deepest_first(l_paths: Vec<AssetPath>) -> Vec<AssetPath> {
    let mut dict_levels: BTreeMap<usize, Vec<AssetPath>> = BTreeMap::new();
    for path in l_paths {
        dict_levels.entry(path.len()).or_default().push(path);
    }
    dict_levels.into_values().rev().flatten().collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

/// Compile a shell-like glob where `*` and `?` never cross a separator.
pub(crate) fn compile_glob(pattern: &str) -> Result<GlobMatcher, AssetTreeError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| AssetTreeError::InvalidPattern(format!("Invalid glob pattern: {e}")))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Description

static L_DESCRIPTION_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    TUP_DESCRIPTION_REPLACEMENTS
        .iter()
        .map(|(chars, replacement)| {
            let pattern = chars
                .chars()
                .map(|c| regex::escape(&c.to_string()))
                .collect::<Vec<_>>()
                .join("|");
            let regex = Regex::new(&pattern).expect("escaped literal alternation");
            (regex, *replacement)
        })
        .collect()
});

static RE_DESCRIPTION_ILLEGAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9.,:;_\-]").expect("static character class"));

/// Rewrite free text into a string accepted as a task description.
///
/// Non-ASCII text is transliterated first. Allowed characters are `a-z`,
/// `A-Z`, `0-9`, `.`, `,`, `:`, `;`, `_` and `-`; the result is at most 100
/// characters long.
pub fn format_description(description: &str) -> String {
    let mut desc = any_ascii(description);
    for (regex, replacement) in L_DESCRIPTION_RULES.iter() {
        desc = regex.replace_all(&desc, *replacement).into_owned();
    }
    let desc = RE_DESCRIPTION_ILLEGAL.replace_all(&desc, "");
    desc.chars().take(N_LEN_DESCRIPTION_MAX).collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{format_description, is_scaffolding, order_deepest_first, split_components};
    use crate::path::AssetPath;

    fn parts(value: &str) -> Vec<String> {
        split_components(value)
    }

    #[test]
    fn split_components_collapses_separators() {
        assert_eq!(parts("//a///b/"), vec!["a", "b"]);
        assert_eq!(parts("a/./b"), vec!["a", "b"]);
        assert!(parts("///").is_empty());
    }

    #[test]
    fn scaffolding_prefixes_are_detected() {
        assert!(is_scaffolding(&parts("")));
        assert!(is_scaffolding(&parts("projects")));
        assert!(is_scaffolding(&parts("projects/owner")));
        assert!(is_scaffolding(&parts("projects/owner/assets")));
        assert!(!is_scaffolding(&parts("projects/owner/assets/folder")));
        assert!(!is_scaffolding(&parts("projects/owner/other")));
        assert!(!is_scaffolding(&parts("folder")));
    }

    #[test]
    fn deepest_level_comes_first() {
        let l_paths = vec![
            AssetPath::from("f/a"),
            AssetPath::from("f/b"),
            AssetPath::from("f/b/c"),
            AssetPath::from("f/b/c/d"),
            AssetPath::from("f/e"),
        ];
        let l_ordered = order_deepest_first(l_paths);
        let l_txt: Vec<String> = l_ordered.iter().map(|p| p.to_string()).collect();
        assert_eq!(l_txt, vec!["f/b/c/d", "f/b/c", "f/a", "f/b", "f/e"]);
    }

    #[test]
    fn description_is_sanitized_and_truncated() {
        assert_eq!(format_description("my image (v2)"), "my_image_:v2:");
        assert_eq!(format_description("a/b?c!"), "a-b.c.");
        assert_eq!(format_description("¿what*"), ".what.");
        assert_eq!(format_description("naïve"), "naive");
        assert_eq!(format_description("Ñandú"), "Nandu");
        assert_eq!(format_description("café crème"), "cafe_creme");
        assert_eq!(format_description(&"x".repeat(150)).len(), 100);
    }
}
