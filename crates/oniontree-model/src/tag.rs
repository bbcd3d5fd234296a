//! Tag derivation from the descriptor's location.

use crate::ParseError;
use std::path::{Component, Path};

/// Returns the directory segment immediately below `root` that contains `path`.
///
/// `root/<tag>/<file>` and `root/<tag>/<sub>/<file>` both yield `<tag>`.
/// A file directly inside `root` has no tag and fails with
/// [`ParseError::MissingTag`]; a path outside `root` fails with
/// [`ParseError::OutsideRoot`].
pub fn derive_tag(root: &Path, path: &Path) -> Result<String, ParseError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| ParseError::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })?;

    let mut components = relative
        .components()
        .filter(|c| !matches!(c, Component::CurDir));
    let first = components.next();
    // The tag directory must be followed by at least the file itself.
    if components.next().is_none() {
        return Err(ParseError::MissingTag {
            path: path.to_path_buf(),
        });
    }

    let segment = match first {
        Some(Component::Normal(segment)) => segment,
        _ => {
            return Err(ParseError::MissingTag {
                path: path.to_path_buf(),
            })
        }
    };

    let tag = segment.to_str().ok_or_else(|| ParseError::InvalidTag {
        path: path.to_path_buf(),
    })?;
    if tag.is_empty() {
        return Err(ParseError::MissingTag {
            path: path.to_path_buf(),
        });
    }
    Ok(tag.to_string())
}
