//! Allocation-owning convenience wrappers over [`PathResolver`]/[`TreeTraversal`],
//! the way `sqsh_easy_*` sits on top of the tree walker: a CLI tool or a quick
//! script wants a path in, an owned `Vec`/`String`/`bool` out, and no cursor to
//! manage across calls.

use std::sync::Arc;

use crate::archive::Archive;
use crate::error::{Result, SqshError};
use crate::file::FileReader;
use crate::inode::FileType;
use crate::resolver::{PathResolver, TraversalEvent, TreeTraversal};

fn to_utf8(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(SqshError::StringUtf8)
}

/// Does `path` resolve to something? A dangling symlink or a missing component
/// is reported as `false`, not an error; anything else (a corrupted archive, an
/// I/O failure) still propagates.
pub fn easy_file_exists(archive: &Arc<Archive>, path: &[u8]) -> Result<bool> {
    let mut resolver = PathResolver::new(archive.clone())?;
    match resolver.resolve(path, true) {
        Ok(()) => Ok(true),
        Err(SqshError::NoSuchFile) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Resolves `path` and reads its file content fully into an owned buffer.
pub fn easy_file_content(archive: &Arc<Archive>, path: &[u8], follow_symlinks: bool) -> Result<Vec<u8>> {
    let mut resolver = PathResolver::new(archive.clone())?;
    resolver.resolve(path, follow_symlinks)?;
    let inode = resolver.open_file()?;
    if inode.file_type() != FileType::File {
        return Err(SqshError::Internal("resolved path is not a regular file"));
    }
    let mut reader = FileReader::new(archive.file_iterator(&inode)?);
    let mut buf = Vec::with_capacity(inode.size() as usize);
    std::io::Read::read_to_end(&mut reader, &mut buf)?;
    Ok(buf)
}

/// Resolves `path` as a directory and lists its entries' names, in iteration
/// order.
pub fn easy_directory_list(archive: &Arc<Archive>, path: &[u8]) -> Result<Vec<String>> {
    let mut resolver = PathResolver::new(archive.clone())?;
    resolver.resolve(path, true)?;
    let inode = resolver.open_file()?;
    let mut iter = archive.directory_iterator(&inode)?;
    let mut names = Vec::new();
    while let Some(entry) = iter.next()? {
        names.push(to_utf8(entry.name)?);
    }
    Ok(names)
}

/// Resolves `path`, then walks the subtree beneath it, dropping the root
/// segment itself -- only descendants are returned.
pub fn easy_tree_traversal(archive: &Arc<Archive>, path: &[u8]) -> Result<Vec<String>> {
    let mut resolver = PathResolver::new(archive.clone())?;
    resolver.resolve(path, true)?;
    let root_ref = resolver.current_inode_ref();
    let root_type = resolver.current_file_type();

    let mut traversal = TreeTraversal::new(archive.clone(), root_ref, root_type, usize::MAX);
    let mut out = Vec::new();
    // Drop the very first event: it is the root itself, re-describing `path`.
    let mut first = true;
    while let Some(entry) = traversal.next()? {
        if first {
            first = false;
            continue;
        }
        if matches!(entry.event, TraversalEvent::File | TraversalEvent::DirectoryBegin) {
            out.push(to_utf8(entry.path)?);
        }
    }
    Ok(out)
}

/// Resolves `path` and returns its full xattr list as `(name, value)` pairs.
pub fn easy_xattr(archive: &Arc<Archive>, path: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut resolver = PathResolver::new(archive.clone())?;
    resolver.resolve(path, true)?;
    let inode = resolver.open_file()?;
    let entries = archive.xattrs_for(&inode)?;
    entries.into_iter().map(|e| Ok((to_utf8(e.fullname())?, e.value))).collect()
}
