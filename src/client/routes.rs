/// How a page path is treated by the auth error policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Login,
    StudentArea,
    TeacherArea,
    Public,
}

impl RouteClass {
    /// Classifies `path` after removing `base_path`. Matching is per segment,
    /// so `/teacher-guide` is public and `/student/login` is a login page.
    pub fn classify(path: &str, base_path: &str) -> Self {
        let path = strip_base_path(path, base_path);
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();

        match segments.as_slice() {
            ["login"] | ["student", "login"] | ["teacher", "login"] => Self::Login,
            ["student", ..] => Self::StudentArea,
            ["teacher", ..] => Self::TeacherArea,
            _ => Self::Public,
        }
    }

    pub fn is_login(self) -> bool {
        self == Self::Login
    }

    pub fn is_role_protected(self) -> bool {
        matches!(self, Self::StudentArea | Self::TeacherArea)
    }
}

/// Prefixes `path` with the deployment prefix unless it is already there.
pub fn with_base_path(base_path: &str, path: &str) -> String {
    if base_path.is_empty() {
        return path.to_string();
    }
    if path == base_path || path.starts_with(&format!("{base_path}/")) {
        return path.to_string();
    }
    if path.is_empty() || path == "/" {
        return base_path.to_string();
    }
    if path.starts_with('/') {
        format!("{base_path}{path}")
    } else {
        format!("{base_path}/{path}")
    }
}

pub(crate) fn strip_base_path<'a>(path: &'a str, base_path: &str) -> &'a str {
    if base_path.is_empty() {
        return path;
    }
    match path.strip_prefix(base_path) {
        Some(rest) if rest.is_empty() || rest.starts_with(['/', '?', '#']) => rest,
        _ => path,
    }
}
