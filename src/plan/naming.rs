use indexmap::IndexMap;

/// Replaces every run of characters not allowed in a target name with a single `-`.
///
/// Letters (any case), digits, `_`, `.` and `-` are kept as they are.
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if c.is_alphanumeric() || matches!(c, '_' | '.' | '-') {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('-');
            in_run = true;
        }
    }
    out
}

pub fn target_repo_name(project: &str, repo: &str) -> String {
    format!("{}-{}", sanitize(project), sanitize(repo))
}

pub fn maintainers_team(project: &str) -> String {
    format!("{}-Maintainers", sanitize(project))
}

pub fn admins_team(project: &str) -> String {
    format!("{}-Admins", sanitize(project))
}

/// Names that occur more than once, each reported once, in order of first collision.
pub fn duplicates<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen: IndexMap<&str, usize> = IndexMap::new();
    let mut dupes = Vec::new();
    for name in names {
        let count = seen.entry(name).or_insert(0);
        *count += 1;
        if *count == 2 {
            dupes.push(name.to_string());
        }
    }
    dupes
}
