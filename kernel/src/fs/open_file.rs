use crate::sync::mutex::Mutex;
use alloc::collections::BTreeMap;
use log::debug;

pub type FileId = u16;

/// An open file as seen by the block layer: only the count of outstanding
/// IORBs and the deferred-close protocol matter here.
#[derive(Clone, Debug, Default)]
pub struct OpenFile {
    iorb_count: usize,
    close_pending: bool,
    closed: bool,
}

impl OpenFile {
    pub fn iorb_count(&self) -> usize {
        self.iorb_count
    }

    pub fn close_pending(&self) -> bool {
        self.close_pending
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

struct OpenFileState {
    content: BTreeMap<FileId, OpenFile>,
    next_id: FileId,
}

pub struct OpenFileTable {
    inner: Mutex<OpenFileState>,
}

impl Default for OpenFileTable {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenFileTable {
    pub const fn new() -> Self {
        OpenFileTable {
            inner: Mutex::new(OpenFileState {
                content: BTreeMap::new(),
                next_id: 0,
            }),
        }
    }

    pub fn open(&self) -> FileId {
        let mut state = self.inner.lock();
        let id = state.next_id;
        if id == FileId::MAX {
            panic!("open file table overflow");
        }
        state.next_id = id + 1;
        state.content.insert(id, OpenFile::default());
        id
    }

    pub fn get(&self, id: FileId) -> Option<OpenFile> {
        self.inner.lock().content.get(&id).cloned()
    }

    pub fn increment_iorb_count(&self, id: FileId) {
        let mut state = self.inner.lock();
        let file = Self::entry(&mut state, id);
        file.iorb_count += 1;
    }

    /// Drops one outstanding IORB and returns the remaining count.
    ///
    /// Panics if the count is already zero.
    pub fn decrement_iorb_count(&self, id: FileId) -> usize {
        let mut state = self.inner.lock();
        let file = Self::entry(&mut state, id);
        assert!(
            file.iorb_count > 0,
            "file {}: IORB count would become negative",
            id
        );
        file.iorb_count -= 1;
        file.iorb_count
    }

    pub fn iorb_count(&self, id: FileId) -> usize {
        let mut state = self.inner.lock();
        Self::entry(&mut state, id).iorb_count
    }

    pub fn close_pending(&self, id: FileId) -> bool {
        let mut state = self.inner.lock();
        Self::entry(&mut state, id).close_pending
    }

    /// Closes the file now if no IORB references it, otherwise defers the
    /// close until the last one completes or is cancelled.
    pub fn request_close(&self, id: FileId) {
        let mut state = self.inner.lock();
        let file = Self::entry(&mut state, id);
        if file.iorb_count == 0 {
            file.closed = true;
            file.close_pending = false;
        } else {
            file.close_pending = true;
        }
    }

    pub fn close(&self, id: FileId) {
        let mut state = self.inner.lock();
        let file = Self::entry(&mut state, id);
        file.closed = true;
        file.close_pending = false;
        debug!("file {} closed", id);
    }

    /// Releases one IORB reference and performs a pending close once the last
    /// reference is gone.
    pub fn release_iorb(&self, id: FileId) {
        if self.decrement_iorb_count(id) == 0 && self.close_pending(id) {
            self.close(id);
        }
    }

    fn entry(state: &mut OpenFileState, id: FileId) -> &mut OpenFile {
        match state.content.get_mut(&id) {
            Some(file) => file,
            None => panic!("no open file with id {}", id),
        }
    }
}
