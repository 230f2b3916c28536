// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::path::{Path, PathBuf};

use crate::{error::FileProviderError, file_provider::FileProvider};

/// Resolves and loads headers from the file system.
pub struct NativeFileProvider {
    /// Directories to search for user headers.
    user_headers_directories: Vec<PathBuf>,

    /// Directories to search for system headers.
    system_headers_directories: Vec<PathBuf>,
}

impl NativeFileProvider {
    /// Creates a new `NativeFileProvider` with the specified directories for user and system headers.
    ///
    /// - `user_headers_directories`: used when resolving `#include` directives with double quotes,
    ///   e.g., `#include "relative/path/to/header.h"`, after the directory of the including file.
    /// - `system_headers_directories`: used when resolving `#include` directives with angle brackets,
    ///   e.g., `#include <stdio.h>`.
    pub fn new(user_headers_directories: &[&Path], system_headers_directories: &[&Path]) -> Self {
        Self {
            user_headers_directories: user_headers_directories
                .iter()
                .map(|&p| PathBuf::from(p))
                .collect(),
            system_headers_directories: system_headers_directories
                .iter()
                .map(|&p| PathBuf::from(p))
                .collect(),
        }
    }

    fn find_in(directories: &[PathBuf], header_file_path: &Path) -> Option<PathBuf> {
        directories
            .iter()
            .map(|dir| dir.join(header_file_path))
            .find(|path| path.is_file())
            .and_then(|path| path.canonicalize().ok())
    }
}

impl FileProvider for NativeFileProvider {
    fn resolve_user_file(&self, header_file_path: &Path) -> Option<PathBuf> {
        Self::find_in(&self.user_headers_directories, header_file_path)
    }

    fn resolve_relative_file(
        &self,
        header_file_path: &Path,
        source_canonical_file_path: &Path,
    ) -> Option<PathBuf> {
        let source_file_directory = source_canonical_file_path.parent()?;
        let full_path = source_file_directory.join(header_file_path);

        if full_path.is_file() {
            full_path.canonicalize().ok()
        } else {
            None
        }
    }

    fn resolve_system_file(&self, header_file_path: &Path) -> Option<PathBuf> {
        Self::find_in(&self.system_headers_directories, header_file_path)
    }

    fn load_file(&self, file_canonical_path: &Path) -> Result<String, FileProviderError> {
        let bytes = std::fs::read(file_canonical_path)?;
        String::from_utf8(bytes)
            .map_err(|_| FileProviderError::InvalidText(file_canonical_path.to_path_buf()))
    }
}
