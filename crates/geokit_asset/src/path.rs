//! Asset identifiers with posix-path semantics.
//!
//! An [`AssetPath`] is a normalized sequence of components. It never talks
//! to the remote store; see [`crate::tree`] for the operations that do.

use std::fmt;
use std::ops::Div;

use globset::GlobMatcher;

use crate::conf::{
    C_ASSETS_ROOT, C_CODE_EDITOR_URI, C_HOME_ALIAS, C_PROJECTS_ROOT, C_SEPARATOR,
    N_PARTS_PROJECT,
};
use crate::spec::AssetTreeError;
use crate::util::{compile_glob, format_description, is_scaffolding, split_components};

////////////////////////////////////////////////////////////////////////////////
// #region AssetPath

/// Slash-delimited asset identifier.
///
/// Leading separators are dropped at construction: the namespace has no
/// absolute root distinct from a relative one. Equality, ordering and
/// hashing only look at the component sequence, so ordering is
/// componentwise (`a/b < a-b`) rather than a plain string comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetPath {
    parts: Vec<String>,
}

impl AssetPath {
    /// Parse an identifier. Never fails; malformed input keeps whatever
    /// components remain.
    pub fn new(value: &str) -> Self {
        Self {
            parts: split_components(value),
        }
    }

    /// Build a path from segments, each of which is normalized.
    pub fn from_parts<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            parts: segments
                .into_iter()
                .flat_map(|segment| split_components(segment.as_ref()))
                .collect(),
        }
    }

    /// Root asset folder of a cloud project: `projects/<project_id>/assets`.
    pub fn home(project_id: &str) -> Self {
        Self::from_parts([C_PROJECTS_ROOT, project_id, C_ASSETS_ROOT])
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn as_posix(&self) -> String {
        self.parts.join(C_SEPARATOR)
    }

    /// Code editor URL showing this asset.
    pub fn as_uri(&self) -> String {
        format!("{C_CODE_EDITOR_URI}{}", self.as_posix())
    }

    /// Last component, or `""` for the empty path.
    pub fn name(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or("")
    }

    /// Drop the last component.
    ///
    /// Not clamped to a project root: the parent of `projects/p/assets/x`
    /// is the (non-asset) project root, and the parent of a single
    /// component is the empty path.
    pub fn parent(&self) -> Self {
        let n_keep = self.parts.len().saturating_sub(1);
        Self {
            parts: self.parts[..n_keep].to_vec(),
        }
    }

    /// Proper prefixes from the immediate parent upwards, without the
    /// namespace scaffolding (`""`, `projects`, `projects/<owner>`,
    /// `projects/<owner>/assets`).
    pub fn ancestors(&self) -> Vec<Self> {
        (0..self.parts.len())
            .rev()
            .map(|n_len| &self.parts[..n_len])
            .filter(|parts| !is_scaffolding(parts))
            .map(|parts| Self {
                parts: parts.to_vec(),
            })
            .collect()
    }

    /// Append one segment, normalized like a full identifier.
    pub fn join(&self, segment: impl AsRef<str>) -> Self {
        let mut parts = self.parts.clone();
        parts.extend(split_components(segment.as_ref()));
        Self { parts }
    }

    /// Append several segments.
    pub fn joinpath<I, S>(&self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        segments
            .into_iter()
            .fold(self.clone(), |path, segment| path.join(segment))
    }

    /// `true` iff `other` is a component prefix of `self` (or equal to it).
    pub fn is_relative_to(&self, other: &AssetPath) -> bool {
        self.parts.starts_with(&other.parts)
    }

    /// Strip `base` from the front of `self`.
    pub fn relative_to(&self, base: &AssetPath) -> Result<Self, AssetTreeError> {
        if !self.is_relative_to(base) {
            return Err(AssetTreeError::structure(
                self,
                format!("is not relative to {base}"),
            ));
        }
        Ok(Self {
            parts: self.parts[base.parts.len()..].to_vec(),
        })
    }

    /// Replace the last component.
    pub fn with_name(&self, name: &str) -> Result<Self, AssetTreeError> {
        if self.parts.is_empty() {
            return Err(AssetTreeError::structure(self, "has an empty name"));
        }
        if name.is_empty() || name.contains(C_SEPARATOR) || name == "." {
            return Err(AssetTreeError::structure(
                self,
                format!("invalid name {name:?}"),
            ));
        }
        Ok(self.parent().join(name))
    }

    /// `projects/<owner>/assets/...`. The owner is not checked for existence.
    pub fn is_absolute(&self) -> bool {
        self.parts.first().is_some_and(|v| v == C_PROJECTS_ROOT)
            && self.parts.get(2).is_some_and(|v| v == C_ASSETS_ROOT)
    }

    pub fn check_absolute(&self) -> Result<&Self, AssetTreeError> {
        if self.is_absolute() {
            return Ok(self);
        }
        Err(AssetTreeError::structure(self, "is not absolute"))
    }

    /// Project root: absolute with exactly three components.
    pub fn is_project(&self) -> bool {
        self.is_absolute() && self.parts.len() == N_PARTS_PROJECT
    }

    pub fn check_project(&self) -> Result<&Self, AssetTreeError> {
        if self.is_project() {
            return Ok(self);
        }
        Err(AssetTreeError::wrong_type(self, "project"))
    }

    /// Project name (second component) of an absolute path.
    pub fn owner(&self) -> Result<&str, AssetTreeError> {
        self.check_absolute()?;
        Ok(&self.parts[1])
    }

    /// Replace a leading `~` component by the home of `project_id`.
    pub fn expanduser(&self, project_id: &str) -> Self {
        match self.parts.split_first() {
            Some((head, rest)) if head == C_HOME_ALIAS => Self::home(project_id).joinpath(rest),
            _ => self.clone(),
        }
    }

    pub fn is_user_project(&self, project_id: &str) -> bool {
        self.is_relative_to(&Self::home(project_id))
    }

    /// Glob match against the trailing components.
    pub fn matches(&self, pattern: &AssetPattern) -> bool {
        pattern.is_match(self)
    }

    /// Compile `pattern` and match it once.
    pub fn is_match(&self, pattern: &str) -> Result<bool, AssetTreeError> {
        Ok(AssetPattern::new(pattern)?.is_match(self))
    }

    /// Asset name rewritten as a task description.
    pub fn as_description(&self) -> String {
        format_description(self.name())
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_posix())
    }
}

impl From<&str> for AssetPath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AssetPath {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<&String> for AssetPath {
    fn from(value: &String) -> Self {
        Self::new(value)
    }
}

impl From<&AssetPath> for AssetPath {
    fn from(value: &AssetPath) -> Self {
        value.clone()
    }
}

impl<S: AsRef<str>> FromIterator<S> for AssetPath {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::from_parts(iter)
    }
}

impl PartialEq<str> for AssetPath {
    fn eq(&self, other: &str) -> bool {
        self.parts == split_components(other)
    }
}

impl PartialEq<&str> for AssetPath {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl Div<&str> for &AssetPath {
    type Output = AssetPath;

    fn div(self, rhs: &str) -> AssetPath {
        self.join(rhs)
    }
}

impl Div<&str> for AssetPath {
    type Output = AssetPath;

    fn div(self, rhs: &str) -> AssetPath {
        self.join(rhs)
    }
}

impl Div<&AssetPath> for &AssetPath {
    type Output = AssetPath;

    fn div(self, rhs: &AssetPath) -> AssetPath {
        self.joinpath(rhs.parts())
    }
}

impl Div<&AssetPath> for AssetPath {
    type Output = AssetPath;

    fn div(self, rhs: &AssetPath) -> AssetPath {
        self.joinpath(rhs.parts())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region AssetPattern

/// Compiled glob matched against the trailing components of a path.
///
/// `*` and `?` stay within one component. A pattern starting with `/` is
/// anchored and must match the whole path. Without `**`, a relative
/// pattern of `n` components matches the last `n` components; with `**`
/// any suffix may match.
#[derive(Debug, Clone)]
pub struct AssetPattern {
    c_pattern: String,
    matcher: GlobMatcher,
    n_parts: usize,
    if_anchored: bool,
    if_recursive: bool,
}

impl AssetPattern {
    pub fn new(pattern: &str) -> Result<Self, AssetTreeError> {
        let l_parts = split_components(pattern);
        if l_parts.is_empty() {
            return Err(AssetTreeError::InvalidPattern(format!(
                "Empty glob pattern: {pattern:?}"
            )));
        }
        let c_pattern = l_parts.join(C_SEPARATOR);
        let matcher = compile_glob(&c_pattern)?;
        Ok(Self {
            if_anchored: pattern.starts_with(C_SEPARATOR),
            if_recursive: l_parts.iter().any(|part| part.contains("**")),
            n_parts: l_parts.len(),
            matcher,
            c_pattern,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.c_pattern
    }

    pub fn is_match(&self, path: &AssetPath) -> bool {
        let parts = path.parts();
        if self.if_anchored {
            return self.matcher.is_match(parts.join(C_SEPARATOR));
        }
        if !self.if_recursive {
            if parts.len() < self.n_parts {
                return false;
            }
            let tail = &parts[parts.len() - self.n_parts..];
            return self.matcher.is_match(tail.join(C_SEPARATOR));
        }
        (1..=parts.len()).any(|n_tail| {
            let tail = &parts[parts.len() - n_tail..];
            self.matcher.is_match(tail.join(C_SEPARATOR))
        })
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{AssetPath, AssetPattern};
    use crate::spec::AssetTreeError;

    #[test]
    fn parse_normalizes_absolute_identifier() {
        let path = AssetPath::new("/projects/p/assets/x/y");
        assert_eq!(path.parts(), ["projects", "p", "assets", "x", "y"]);
        assert!(path.is_absolute());
        assert_eq!(path.name(), "y");
        assert_eq!(path.parent().parts(), ["projects", "p", "assets", "x"]);
        assert_eq!(path.to_string(), "projects/p/assets/x/y");
    }

    #[test]
    fn parse_is_idempotent_on_messy_input() {
        for raw in [
            "",
            "/",
            "//a//b//",
            "///projects//p/assets/x",
            "a/./b/../c",
            "name",
            "~/folder/",
        ] {
            let path = AssetPath::new(raw);
            assert_eq!(AssetPath::new(&path.to_string()), path, "input {raw:?}");
        }
    }

    #[test]
    fn equality_ignores_literal_spelling() {
        assert_eq!(AssetPath::new("a/b"), AssetPath::new("/a//b/"));
        assert_eq!(AssetPath::new("a/b"), "a/b/");
        assert_ne!(AssetPath::new("a/b"), "a/c");
        assert_eq!(AssetPath::from_parts(["a", "b/c"]), AssetPath::new("a/b/c"));
        assert_eq!(
            ["x", "y"].into_iter().collect::<AssetPath>(),
            AssetPath::new("x/y")
        );
    }

    #[test]
    fn ordering_is_componentwise() {
        let path_nested = AssetPath::new("a/b");
        let path_dash = AssetPath::new("a-b");
        assert!(path_nested < path_dash);
        assert!("a/b" > "a-b");

        assert!(AssetPath::new("a") < AssetPath::new("a/b"));
        assert!(AssetPath::new("a/c") >= AssetPath::new("a/b/z"));
        assert!(AssetPath::new("a/b") <= AssetPath::new("a/b"));
    }

    #[test]
    fn parent_is_not_clamped_to_project_root() {
        assert_eq!(AssetPath::new("single").parent(), AssetPath::default());
        assert!(AssetPath::default().parent().is_empty());
        let project = AssetPath::new("projects/p/assets/x").parent();
        assert!(project.is_project());
        assert_eq!(project.parent(), "projects/p");
    }

    #[test]
    fn ancestors_skip_scaffolding() {
        let path = AssetPath::new("projects/p/assets/a/b/c");
        let l_txt: Vec<String> = path.ancestors().iter().map(|p| p.to_string()).collect();
        assert_eq!(
            l_txt,
            vec!["projects/p/assets/a/b", "projects/p/assets/a"]
        );

        assert!(AssetPath::new("projects/p/assets/a").ancestors().is_empty());
        assert_eq!(
            AssetPath::new("x/y/z").ancestors(),
            vec![AssetPath::new("x/y"), AssetPath::new("x")]
        );
    }

    #[test]
    fn ancestors_never_contain_scaffolding_for_deep_paths() {
        let l_scaffolding = [
            AssetPath::default(),
            AssetPath::new("projects"),
            AssetPath::new("projects/owner"),
            AssetPath::new("projects/owner/assets"),
        ];
        for n_depth in 4..10 {
            let path = AssetPath::from_parts(
                ["projects", "owner", "assets"]
                    .into_iter()
                    .map(str::to_string)
                    .chain((3..n_depth).map(|i| format!("f{i}"))),
            );
            let l_ancestors = path.ancestors();
            assert_eq!(l_ancestors.len(), n_depth - 4);
            assert!(l_scaffolding.iter().all(|s| !l_ancestors.contains(s)));
        }
    }

    #[test]
    fn join_and_relative_to() {
        let base = AssetPath::new("projects/p/assets");
        let joined = base.join("x/y");
        assert_eq!(joined, "projects/p/assets/x/y");
        assert_eq!(&base / "x" / "y", joined);
        assert_eq!(base.joinpath(["x", "/y/"]), joined);
        assert_eq!(&base / &AssetPath::new("x/y"), joined);

        assert!(joined.is_relative_to(&joined));
        assert!(joined.is_relative_to(&base));
        assert!(base.join("x").is_relative_to(&base));
        assert!(!base.is_relative_to(&joined));
        assert!(!AssetPath::new("a/bc").is_relative_to(&AssetPath::new("a/b")));

        assert_eq!(joined.relative_to(&base).expect("relative"), "x/y");
        let err = base.relative_to(&joined).expect_err("must fail");
        assert!(matches!(err, AssetTreeError::InvalidStructure { .. }));
    }

    #[test]
    fn with_name_replaces_last_component() {
        let path = AssetPath::new("projects/p/assets/folder/image");
        assert_eq!(
            path.with_name("renamed").expect("rename"),
            "projects/p/assets/folder/renamed"
        );
        assert!(path.with_name("").is_err());
        assert!(path.with_name("a/b").is_err());
        assert!(AssetPath::default().with_name("x").is_err());
    }

    #[test]
    fn structural_predicates() {
        let project = AssetPath::new("projects/p/assets");
        assert!(project.is_absolute());
        assert!(project.is_project());
        assert!(project.check_project().is_ok());
        assert_eq!(project.owner().expect("owner"), "p");

        let relative = AssetPath::new("folder/image");
        assert!(!relative.is_absolute());
        assert!(!AssetPath::new("projects/p/other/x").is_absolute());
        assert!(matches!(
            relative.check_absolute(),
            Err(AssetTreeError::InvalidStructure { .. })
        ));
        assert!(relative.owner().is_err());
        assert!(!AssetPath::new("projects/p/assets/x").is_project());
    }

    #[test]
    fn home_and_user_project() {
        let home = AssetPath::home("ee-me");
        assert_eq!(home, "projects/ee-me/assets");
        assert!(home.join("x").is_user_project("ee-me"));
        assert!(!home.join("x").is_user_project("ee-other"));
        assert_eq!(
            AssetPath::new("~/folder/image").expanduser("ee-me"),
            "projects/ee-me/assets/folder/image"
        );
        assert_eq!(AssetPath::new("a/~").expanduser("ee-me"), "a/~");
    }

    #[test]
    fn uri_and_description() {
        let path = AssetPath::new("projects/p/assets/my image");
        assert_eq!(
            path.as_uri(),
            "https://code.earthengine.google.com/?asset=projects/p/assets/my image"
        );
        assert_eq!(path.as_description(), "my_image");
    }

    #[test]
    fn glob_matches_trailing_components() {
        let path = AssetPath::new("projects/p/assets/folder/img1");
        assert!(path.is_match("img*").expect("pattern"));
        assert!(path.is_match("img?").expect("pattern"));
        assert!(path.is_match("folder/img*").expect("pattern"));
        assert!(path.is_match("*/img1").expect("pattern"));
        assert!(!path.is_match("tab*").expect("pattern"));
        assert!(!path.is_match("folder").expect("pattern"));
        assert!(!path.is_match("fol*").expect("pattern"));
        assert!(!path.is_match("a/b/c/d/e/f/img1").expect("pattern"));
    }

    #[test]
    fn glob_anchored_and_recursive() {
        let path = AssetPath::new("projects/p/assets/folder/sub/img1");
        assert!(path.is_match("**/img1").expect("pattern"));
        assert!(path.is_match("folder/**/img1").expect("pattern"));
        assert!(path.is_match("/projects/*/assets/**").expect("pattern"));
        assert!(!path.is_match("/folder/**").expect("pattern"));
        assert!(!path.is_match("/img1").expect("pattern"));
    }

    #[test]
    fn invalid_patterns_are_rejected() {
        assert!(matches!(
            AssetPattern::new(""),
            Err(AssetTreeError::InvalidPattern(_))
        ));
        assert!(matches!(
            AssetPattern::new("["),
            Err(AssetTreeError::InvalidPattern(_))
        ));
        assert_eq!(AssetPattern::new("/a//b*").expect("pattern").as_str(), "a/b*");
    }
}
