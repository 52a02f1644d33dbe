//! Path resolution and recursive tree traversal, built entirely on
//! [`Archive::directory_iterator`] and the inode map it maintains as a side effect
//! of every directory step taken.
//!
//! [`PathResolver`] is a cursor: it always sits inside some directory (initially the
//! root) and optionally has a currently-resolved entry inside it. `up`/`down` move
//! the cursor's directory; `lookup`/`next` move the resolved entry within the
//! current directory. `resolve` drives both from a `/`-separated path, the way
//! `sqsh_tree_walker_resolve` drives `sqsh_tree_walker_{up,down,lookup}` in the
//! original implementation.
//!
//! [`TreeTraversal`] is the stack-based sibling: rather than a single cursor it
//! walks every reachable entry under a root, emitting begin/end events around each
//! directory it descends into.

use std::sync::Arc;

use crate::archive::Archive;
use crate::directory::DirectoryIterator;
use crate::error::{Result, SqshError};
use crate::inode::{FileType, Inode, InodeRef};

/// Cursor-based path walker. See the module documentation for the directory/entry
/// split this type maintains.
pub struct PathResolver {
    archive: Arc<Archive>,
    root_inode_ref: InodeRef,
    directory_inode_ref: InodeRef,
    directory_inode: Inode,
    dir_iter: Option<DirectoryIterator>,
    current_inode_ref: InodeRef,
    current_type: FileType,
    /// `false` until `next`/`lookup` has produced an entry distinct from the
    /// enclosing directory itself -- mirrors the original's `begin_iterator` flag.
    at_entry: bool,
    max_symlink_depth: u32,
}

impl PathResolver {
    /// A resolver positioned at the archive's root directory.
    pub fn new(archive: Arc<Archive>) -> Result<Self> {
        let root_inode_ref = archive.root_inode_ref();
        let max_symlink_depth = archive.config().max_symlink_depth;
        let directory_inode = archive.load_inode(root_inode_ref)?;
        if directory_inode.file_type() != FileType::Directory {
            return Err(SqshError::NotADirectory);
        }
        Ok(Self {
            archive,
            root_inode_ref,
            directory_inode_ref: root_inode_ref,
            directory_inode,
            dir_iter: None,
            current_inode_ref: root_inode_ref,
            current_type: FileType::Directory,
            at_entry: false,
            max_symlink_depth,
        })
    }

    fn enter_directory(&mut self, inode_ref: InodeRef) -> Result<()> {
        let inode = self.archive.load_inode(inode_ref)?;
        if inode.file_type() != FileType::Directory {
            return Err(SqshError::NotADirectory);
        }
        self.directory_inode_ref = inode_ref;
        self.current_inode_ref = inode_ref;
        self.current_type = FileType::Directory;
        self.directory_inode = inode;
        self.dir_iter = None;
        self.at_entry = false;
        Ok(())
    }

    /// Reset the cursor to the archive's root.
    pub fn to_root(&mut self) -> Result<()> {
        self.enter_directory(self.root_inode_ref)
    }

    /// Move the cursor's directory up to its parent. Fails at the root.
    pub fn up(&mut self) -> Result<()> {
        if self.directory_inode_ref == self.root_inode_ref {
            return Err(SqshError::WalkerCannotGoUp);
        }
        let (_, _, parent_number) = self.directory_inode.directory_location()?;
        if parent_number == 0 {
            return Err(SqshError::CorruptedInode);
        }
        let parent_ref = self
            .archive
            .inode_ref_for_number(parent_number)?
            .ok_or(SqshError::Internal("parent inode reference not yet discovered"))?;
        self.enter_directory(parent_ref)
    }

    /// Descend into the currently-resolved entry. Fails if nothing has been
    /// resolved yet in the current directory, or if it isn't a directory.
    pub fn down(&mut self) -> Result<()> {
        if !self.at_entry {
            return Err(SqshError::WalkerCannotGoDown);
        }
        self.enter_directory(self.current_inode_ref)
    }

    /// Advance to the next entry of the current directory. Returns `false` once
    /// the directory is exhausted, the way [`DirectoryIterator::next`] does.
    pub fn next(&mut self) -> Result<bool> {
        if self.dir_iter.is_none() {
            self.dir_iter = Some(self.archive.directory_iterator(&self.directory_inode)?);
        }
        match self.dir_iter.as_mut().expect("just populated").next()? {
            Some(entry) => {
                self.archive.record_inode_ref(entry.inode_number, entry.inode_ref)?;
                self.current_inode_ref = entry.inode_ref;
                self.current_type = entry.file_type;
                self.at_entry = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Re-seek to the start of the current directory, dropping any resolved entry.
    pub fn revert(&mut self) -> Result<()> {
        self.dir_iter = Some(self.archive.directory_iterator(&self.directory_inode)?);
        self.current_inode_ref = self.directory_inode_ref;
        self.current_type = FileType::Directory;
        self.at_entry = false;
        Ok(())
    }

    /// Resolve `name` within the current directory. Always re-seeks to the start
    /// first, so a failed lookup still leaves the cursor at a well-defined place.
    pub fn lookup(&mut self, name: &[u8]) -> Result<()> {
        let mut iter = self.archive.directory_iterator(&self.directory_inode)?;
        let entry = iter.lookup(name)?;
        self.archive.record_inode_ref(entry.inode_number, entry.inode_ref)?;
        self.current_inode_ref = entry.inode_ref;
        self.current_type = entry.file_type;
        self.at_entry = true;
        self.dir_iter = Some(iter);
        Ok(())
    }

    /// Loads the inode of whatever the cursor currently points at (the enclosing
    /// directory itself if nothing has been resolved yet).
    pub fn open_file(&self) -> Result<Inode> {
        self.archive.load_inode(self.current_inode_ref)
    }

    pub fn current_inode_ref(&self) -> InodeRef {
        self.current_inode_ref
    }

    pub fn current_file_type(&self) -> FileType {
        self.current_type
    }

    /// One pass over `path`'s segments, without following a trailing symlink.
    fn resolve_once(&mut self, path: &[u8]) -> Result<()> {
        if path.first() == Some(&b'/') {
            self.to_root()?;
        }
        for segment in path.split(|&b| b == b'/') {
            if segment.is_empty() || segment == b"." {
                continue;
            }
            if segment == b".." {
                // `..` at the root is a clamped no-op, not an error -- unlike the
                // `up` primitive, which is meant to surface that boundary.
                match self.up() {
                    Ok(()) | Err(SqshError::WalkerCannotGoUp) => {}
                    Err(e) => return Err(e),
                }
                continue;
            }
            self.lookup(segment)?;
            if self.current_file_type() == FileType::Directory {
                self.down()?;
            }
        }
        Ok(())
    }

    /// Resolve `path`, optionally following a trailing symlink chain up to the
    /// archive's configured `max_symlink_depth`.
    pub fn resolve(&mut self, path: &[u8], follow_symlinks: bool) -> Result<()> {
        let mut current_path = path.to_vec();
        for _ in 0..self.max_symlink_depth.max(1) {
            self.resolve_once(&current_path)?;
            if !follow_symlinks {
                return Ok(());
            }
            if self.current_file_type() != FileType::Symlink {
                return Ok(());
            }
            let inode = self.open_file()?;
            current_path = inode.symlink_target().ok_or(SqshError::CorruptedInode)?.to_vec();
        }
        Err(SqshError::TooManySymlinks)
    }
}

/// One step of a [`TreeTraversal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalEvent {
    /// A non-directory entry (or the root, if it isn't a directory).
    File,
    /// Descending into a directory; a matching `DirectoryEnd` follows once its
    /// entries (and their subtrees, within `max_depth`) are exhausted.
    DirectoryBegin,
    DirectoryEnd,
}

/// One yielded step, carrying enough to load the entry or print its path without
/// re-walking the tree.
pub struct TraversalEntry {
    pub event: TraversalEvent,
    pub name: Vec<u8>,
    /// Full `/`-joined path from the traversal root to this entry.
    pub path: Vec<u8>,
    pub depth: usize,
    pub inode_ref: InodeRef,
    pub file_type: FileType,
    archive: Arc<Archive>,
}

impl TraversalEntry {
    pub fn open_file(&self) -> Result<Inode> {
        self.archive.load_inode(self.inode_ref)
    }
}

struct Frame {
    iter: DirectoryIterator,
    inode_ref: InodeRef,
}

/// Stack-based iterator yielding every reachable entry under a root, bounded by
/// `max_depth`. Never follows symlinks; callers decide per entry whether to.
pub struct TreeTraversal {
    archive: Arc<Archive>,
    max_depth: usize,
    stack: Vec<Frame>,
    path: Vec<Vec<u8>>,
    root: Option<(InodeRef, FileType)>,
    done: bool,
}

impl TreeTraversal {
    pub fn new(archive: Arc<Archive>, root_ref: InodeRef, root_type: FileType, max_depth: usize) -> Self {
        Self { archive, max_depth, stack: Vec::new(), path: Vec::new(), root: Some((root_ref, root_type)), done: false }
    }

    fn full_path(&self, name: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for (i, segment) in self.path.iter().enumerate() {
            if i > 0 {
                out.push(b'/');
            }
            out.extend_from_slice(segment);
        }
        if !self.path.is_empty() && !name.is_empty() {
            out.push(b'/');
        }
        out.extend_from_slice(name);
        out
    }

    fn push_directory(&mut self, inode_ref: InodeRef, name: Vec<u8>) -> Result<()> {
        let inode = self.archive.load_inode(inode_ref)?;
        let iter = self.archive.directory_iterator(&inode)?;
        self.stack.push(Frame { iter, inode_ref });
        self.path.push(name);
        Ok(())
    }

    /// Returns the next traversal event, or `None` once the whole subtree has
    /// been emitted.
    pub fn next(&mut self) -> Result<Option<TraversalEntry>> {
        if self.done {
            return Ok(None);
        }

        if let Some((root_ref, root_type)) = self.root.take() {
            let depth = 0;
            if root_type == FileType::Directory && depth < self.max_depth {
                self.push_directory(root_ref, Vec::new())?;
                return Ok(Some(TraversalEntry {
                    event: TraversalEvent::DirectoryBegin,
                    name: Vec::new(),
                    path: Vec::new(),
                    depth,
                    inode_ref: root_ref,
                    file_type: root_type,
                    archive: self.archive.clone(),
                }));
            }
            self.done = true;
            return Ok(Some(TraversalEntry {
                event: TraversalEvent::File,
                name: Vec::new(),
                path: Vec::new(),
                depth,
                inode_ref: root_ref,
                file_type: root_type,
                archive: self.archive.clone(),
            }));
        }

        loop {
            let Some(frame) = self.stack.last_mut() else {
                self.done = true;
                return Ok(None);
            };

            match frame.iter.next()? {
                Some(entry) => {
                    self.archive.record_inode_ref(entry.inode_number, entry.inode_ref)?;
                    let depth = self.stack.len();
                    let full_path = self.full_path(&entry.name);
                    if entry.file_type == FileType::Directory && depth < self.max_depth {
                        self.push_directory(entry.inode_ref, entry.name.clone())?;
                        return Ok(Some(TraversalEntry {
                            event: TraversalEvent::DirectoryBegin,
                            name: entry.name,
                            path: full_path,
                            depth,
                            inode_ref: entry.inode_ref,
                            file_type: entry.file_type,
                            archive: self.archive.clone(),
                        }));
                    }
                    return Ok(Some(TraversalEntry {
                        event: TraversalEvent::File,
                        name: entry.name,
                        path: full_path,
                        depth,
                        inode_ref: entry.inode_ref,
                        file_type: entry.file_type,
                        archive: self.archive.clone(),
                    }));
                }
                None => {
                    let closed = self.stack.pop().expect("loop only reached via Some(frame)");
                    self.path.pop();
                    let depth = self.stack.len();
                    let path = self.current_path();
                    return Ok(Some(TraversalEntry {
                        event: TraversalEvent::DirectoryEnd,
                        name: Vec::new(),
                        path,
                        depth,
                        inode_ref: closed.inode_ref,
                        file_type: FileType::Directory,
                        archive: self.archive.clone(),
                    }));
                }
            }
        }
    }

    /// The full `/`-joined path of the directory the last `DirectoryBegin`
    /// descended into, for callers building listings like `sqsh_easy_tree_traversal`.
    pub fn current_path(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (i, segment) in self.path.iter().enumerate() {
            if i > 0 {
                out.push(b'/');
            }
            out.extend_from_slice(segment);
        }
        out
    }
}
