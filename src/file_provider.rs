// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::path::{Component, Path, PathBuf};

use crate::error::FileProviderError;

/// The include environment of a preprocessing run.
///
/// Paths returned by the `resolve_*` methods are canonical, they are used
/// as the identity of a file (e.g. for `#pragma once`) and as the
/// file name in diagnostics.
pub trait FileProvider {
    /// Resolves a header file path against the user header search directories.
    fn resolve_user_file(&self, header_file_path: &Path) -> Option<PathBuf>;

    /// Resolves a header file path against the directory of the including file.
    fn resolve_relative_file(
        &self,
        header_file_path: &Path,
        source_canonical_file_path: &Path,
    ) -> Option<PathBuf>;

    /// Resolves a header file path against the system header search directories.
    fn resolve_system_file(&self, header_file_path: &Path) -> Option<PathBuf>;

    /// Resolves a quoted include, e.g., `#include "header.h"`.
    ///
    /// The resolution process is as follows:
    /// 1. If the including file is a real file, try its directory.
    /// 2. If not found, try the user header search directories.
    /// 3. If still not found, try the system header search directories.
    fn resolve_quoted_file(
        &self,
        header_file_path: &Path,
        source_canonical_file_path: Option<&Path>,
    ) -> Option<PathBuf> {
        if let Some(source_path) = source_canonical_file_path {
            if let Some(resolved_path) = self.resolve_relative_file(header_file_path, source_path)
            {
                return Some(resolved_path);
            }
        }

        self.resolve_user_file(header_file_path)
            .or_else(|| self.resolve_system_file(header_file_path))
    }

    /// Loads the text of a file given its canonical path.
    fn load_file(&self, file_canonical_path: &Path) -> Result<String, FileProviderError>;
}

/// Removes `.` and resolves `..` components lexically, without touching the file system.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            _ => normalized.push(component),
        }
    }

    normalized
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use pretty_assertions::assert_eq;

    use super::normalize_path;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/projects/test/src/./../include/a.h")),
            PathBuf::from("/projects/test/include/a.h")
        );
        assert_eq!(
            normalize_path(Path::new("/usr/include/sys/../stdio.h")),
            PathBuf::from("/usr/include/stdio.h")
        );
    }
}
