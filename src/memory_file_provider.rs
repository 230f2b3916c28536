// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::{
    error::FileProviderError,
    file_provider::{FileProvider, normalize_path},
};

/// An in-memory file provider, for embedding headers and for tests.
///
/// The default instance searches user headers in `/include`
/// and system headers in `/usr/include`.
pub struct MemoryFileProvider {
    /// Maps normalized absolute file paths to their contents.
    file_content_map: HashMap<PathBuf, String>,

    /// Directories to search for user headers.
    user_directories: Vec<PathBuf>,

    /// Directories to search for system headers.
    system_directories: Vec<PathBuf>,
}

impl MemoryFileProvider {
    pub fn new(user_directories: &[&str], system_directories: &[&str]) -> Self {
        Self {
            file_content_map: HashMap::new(),
            user_directories: user_directories.iter().map(PathBuf::from).collect(),
            system_directories: system_directories.iter().map(PathBuf::from).collect(),
        }
    }

    /// Adds a file, `file_path` must be absolute.
    pub fn add_file(&mut self, file_path: &str, content: &str) {
        let normalized_path = normalize_path(Path::new(file_path));
        self.file_content_map
            .insert(normalized_path, content.to_owned());
    }

    /// Adds a file under the first system directory, e.g. `stdio.h`.
    pub fn add_system_file(&mut self, relative_path: &str, content: &str) {
        let directory = self
            .system_directories
            .first()
            .cloned()
            .unwrap_or_else(|| PathBuf::from("/"));
        let normalized_path = normalize_path(&directory.join(relative_path));
        self.file_content_map
            .insert(normalized_path, content.to_owned());
    }

    fn find_in(&self, directories: &[PathBuf], header_file_path: &Path) -> Option<PathBuf> {
        directories
            .iter()
            .map(|dir| normalize_path(&dir.join(header_file_path)))
            .find(|path| self.file_content_map.contains_key(path))
    }
}

impl Default for MemoryFileProvider {
    fn default() -> Self {
        Self::new(&["/include"], &["/usr/include"])
    }
}

impl FileProvider for MemoryFileProvider {
    fn resolve_user_file(&self, header_file_path: &Path) -> Option<PathBuf> {
        self.find_in(&self.user_directories, header_file_path)
    }

    fn resolve_relative_file(
        &self,
        header_file_path: &Path,
        source_canonical_file_path: &Path,
    ) -> Option<PathBuf> {
        let source_file_directory = source_canonical_file_path.parent()?;
        let canonical_full_path = normalize_path(&source_file_directory.join(header_file_path));

        if self.file_content_map.contains_key(&canonical_full_path) {
            Some(canonical_full_path)
        } else {
            None
        }
    }

    fn resolve_system_file(&self, header_file_path: &Path) -> Option<PathBuf> {
        self.find_in(&self.system_directories, header_file_path)
    }

    fn load_file(&self, file_canonical_path: &Path) -> Result<String, FileProviderError> {
        self.file_content_map
            .get(file_canonical_path)
            .cloned()
            .ok_or_else(|| FileProviderError::NotFound(file_canonical_path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use pretty_assertions::assert_eq;

    use crate::file_provider::FileProvider;

    use super::MemoryFileProvider;

    #[test]
    fn test_memory_file_provider() {
        let mut provider = MemoryFileProvider::new(&["/projects/test/header"], &["/usr/include"]);
        provider.add_file("/projects/test/src/main.c", "SRC_MAIN_C");
        provider.add_file("/projects/test/src/lib.h", "SRC_LIB_H");
        provider.add_file("/projects/test/header/foo.h", "HEADER_FOO_H");
        provider.add_file("/projects/test/header/folder/buz.h", "HEADER_FOLDER_BUZ_H");
        provider.add_system_file("stdio.h", "STDIO_H");

        // load
        assert_eq!(
            provider
                .load_file(Path::new("/projects/test/src/main.c"))
                .unwrap(),
            "SRC_MAIN_C"
        );
        assert!(provider.load_file(Path::new("/projects/test/none.c")).is_err());

        // user and system directories
        assert_eq!(
            provider.resolve_user_file(Path::new("folder/buz.h")),
            Some(PathBuf::from("/projects/test/header/folder/buz.h"))
        );
        assert_eq!(
            provider.resolve_system_file(Path::new("stdio.h")),
            Some(PathBuf::from("/usr/include/stdio.h"))
        );
        assert_eq!(provider.resolve_system_file(Path::new("foo.h")), None);

        // relative to the including file
        assert_eq!(
            provider.resolve_relative_file(
                Path::new("../foo.h"),
                Path::new("/projects/test/header/folder/buz.h")
            ),
            Some(PathBuf::from("/projects/test/header/foo.h"))
        );

        // quoted includes fall back from the current directory to user and system directories
        let main = Path::new("/projects/test/src/main.c");
        assert_eq!(
            provider.resolve_quoted_file(Path::new("lib.h"), Some(main)),
            Some(PathBuf::from("/projects/test/src/lib.h"))
        );
        assert_eq!(
            provider.resolve_quoted_file(Path::new("foo.h"), Some(main)),
            Some(PathBuf::from("/projects/test/header/foo.h"))
        );
        assert_eq!(
            provider.resolve_quoted_file(Path::new("stdio.h"), Some(main)),
            Some(PathBuf::from("/usr/include/stdio.h"))
        );
        assert_eq!(provider.resolve_quoted_file(Path::new("lib.h"), None), None);
    }
}
