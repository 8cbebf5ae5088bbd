//! Pass-through pipeline stage.
//!
//! A [`Stage`] reports every item it sees as changed and hands the item on
//! untouched. It never buffers or reorders.

use std::path::{Path, PathBuf};

use futures_util::{Stream, StreamExt};
use refresh_server::{ServerFactory, WsServerFactory};

use crate::facade::LiveReload;

/// An item that names a file on disk.
pub trait HasPath {
    /// Path of the file this item represents.
    fn path(&self) -> &Path;
}

impl HasPath for Path {
    fn path(&self) -> &Path {
        self
    }
}

impl HasPath for PathBuf {
    fn path(&self) -> &Path {
        self
    }
}

impl<T: HasPath + ?Sized> HasPath for &T {
    fn path(&self) -> &Path {
        (**self).path()
    }
}

/// A file flowing through a build pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangedFile {
    /// Location of the file.
    pub path: PathBuf,
    /// File contents, if the pipeline carries them.
    pub contents: Option<Vec<u8>>,
}

impl ChangedFile {
    /// A file known only by its path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            contents: None,
        }
    }

    /// Attach contents.
    #[must_use]
    pub fn with_contents(mut self, contents: impl Into<Vec<u8>>) -> Self {
        self.contents = Some(contents.into());
        self
    }
}

impl HasPath for ChangedFile {
    fn path(&self) -> &Path {
        &self.path
    }
}

/// Pipeline stage created by [`LiveReload::stage`].
pub struct Stage<F: ServerFactory = WsServerFactory> {
    notifier: LiveReload<F>,
}

impl<F: ServerFactory> Clone for Stage<F> {
    fn clone(&self) -> Self {
        Self {
            notifier: self.notifier.clone(),
        }
    }
}

impl<F: ServerFactory> Stage<F> {
    pub(crate) fn new(notifier: LiveReload<F>) -> Self {
        Self { notifier }
    }

    /// The notifier this stage reports to.
    pub fn notifier(&self) -> &LiveReload<F> {
        &self.notifier
    }

    /// Report `item` as changed and return it.
    pub fn pass<T: HasPath>(&self, item: T) -> T {
        self.notifier.changed_file(&item);
        item
    }

    /// Wrap a stream, reporting each item as it is polled through.
    pub fn pipe<S>(self, input: S) -> impl Stream<Item = S::Item>
    where
        S: Stream,
        S::Item: HasPath,
    {
        input.map(move |item| self.pass(item))
    }

    /// Wrap an iterator, reporting each item as it is pulled through.
    pub fn pipe_iter<I>(self, input: I) -> impl Iterator<Item = I::Item>
    where
        I: IntoIterator,
        I::Item: HasPath,
    {
        input.into_iter().map(move |item| self.pass(item))
    }
}
