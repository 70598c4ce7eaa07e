/// Lexically normalizes a slash-separated path.
///
/// Empty and `.` segments are dropped, `..` removes the preceding segment
/// (or is kept when there is nothing to remove on a relative path), and a
/// leading `/` is preserved. The empty path cleans to `.`.
pub fn clean(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let body = parts.join("/");
    match (rooted, body.is_empty()) {
        (true, _) => format!("/{body}"),
        (false, true) => ".".to_string(),
        (false, false) => body,
    }
}

/// Joins `name` onto `dir` and cleans the result.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        return clean(name);
    }
    if name.is_empty() {
        return clean(dir);
    }
    clean(&format!("{dir}/{name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn clean_folds_dot_segments() {
        assert_eq!(clean(""), ".");
        assert_eq!(clean("."), ".");
        assert_eq!(clean("a//b/./c/"), "a/b/c");
        assert_eq!(clean("a/b/../c"), "a/c");
        assert_eq!(clean("../a"), "../a");
        assert_eq!(clean("a/../.."), "..");
        assert_eq!(clean("/../a"), "/a");
        assert_eq!(clean("/"), "/");
    }

    #[test]
    fn join_matches_metadata_lookup_paths() {
        assert_eq!(join("p1", "METADATA.android"), "p1/METADATA.android");
        assert_eq!(join("p1/", "METADATA"), "p1/METADATA");
        assert_eq!(join("", "METADATA"), "METADATA");
        assert_eq!(join("external/zlib", ""), "external/zlib");
    }

    proptest! {
        #[test]
        fn clean_is_idempotent(
            segments in prop::collection::vec(
                prop_oneof![
                    Just(String::new()),
                    Just(".".to_string()),
                    Just("..".to_string()),
                    "[a-z]{1,3}",
                ],
                0..8,
            )
        ) {
            let path = segments.join("/");
            let once = clean(&path);
            prop_assert_eq!(clean(&once), once);
        }
    }
}
