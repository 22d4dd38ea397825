//! Shared fixtures for unit tests.

use crate::editor::{BufferHandle, Editor};
use crate::memory::MemoryEditor;
use crate::session::Session;
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

pub(crate) fn session_with_editor() -> (Session, MemoryEditor) {
    (Session::new(), MemoryEditor::new())
}

/// Create a host buffer holding `text` and bind it to `bufno` as if the tool
/// had finished loading it.
pub(crate) fn registered_buffer(
    session: &mut Session,
    editor: &mut MemoryEditor,
    bufno: u32,
    text: &str,
) -> BufferHandle {
    let buf = editor.create_buffer(Some(&format!("/tmp/nbsync-test-{}.txt", bufno)));
    editor.set_text(buf, text);
    editor.set_modified(buf, false);
    let entry = session.buffers.entry(bufno);
    entry.handle = Some(buf);
    entry.insert_done = true;
    entry.init_done = true;
    buf
}

/// Writer that records everything written to it.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedSink(Rc<RefCell<Vec<u8>>>);

impl SharedSink {
    pub(crate) fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_string).collect()
    }

    pub(crate) fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writer whose every write fails.
#[derive(Debug, Default)]
pub(crate) struct FailingSink;

impl Write for FailingSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
