//! Asset namespace constants.

/// Component separator of asset identifiers.
pub const C_SEPARATOR: &str = "/";
/// First component of every absolute asset identifier.
pub const C_PROJECTS_ROOT: &str = "projects";
/// Third component of every absolute asset identifier.
pub const C_ASSETS_ROOT: &str = "assets";
/// Leading component expanded to the user's home by `expanduser`.
pub const C_HOME_ALIAS: &str = "~";
/// Code editor URL prefix; the asset id is appended verbatim.
pub const C_CODE_EDITOR_URI: &str = "https://code.earthengine.google.com/?asset=";

/// Number of components of a project root (`projects/<owner>/assets`).
pub const N_PARTS_PROJECT: usize = 3;
/// Maximum length of a task description.
pub const N_LEN_DESCRIPTION_MAX: usize = 100;

/// Character groups rewritten by `format_description`, with their replacement.
pub const TUP_DESCRIPTION_REPLACEMENTS: [(&str, &str); 4] = [
    (" ", "_"),
    ("/", "-"),
    ("?!¿*", "."),
    ("()[]{}", ":"),
];
