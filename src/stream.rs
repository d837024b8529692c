//! Reference-counted, cascade-closing stream handles.
//!
//! A handle tracks an optional parent, a child counter, and an
//! `autoclose_on_last_child` flag. A child's close decrements its
//! parent's counter; an autoclose parent whose counter reaches zero
//! closes itself too. This is what lets the tar reader release a
//! shard's file descriptor exactly when the last record drawn from it
//! is done being read, even though records are yielded lazily one at a
//! time.

use std::cell::{Cell, RefCell};
use std::io::{self, Read};
use std::rc::Rc;

/// Notified when one of this resource's children closes or is opened.
/// Lets a parent handle cascade-close without knowing its children's
/// concrete reader type.
trait Parent {
  fn child_opened(&self);
  fn child_closed(&self);
}

struct Inner<R> {
  resource: RefCell<Option<R>>,
  parent: Option<Rc<dyn Parent>>,
  child_count: Cell<usize>,
  autoclose_on_last_child: Cell<bool>,
  closed: Cell<bool>,
  name: String,
}

impl<R> Parent for Inner<R> {
  fn child_opened(&self) {
    self.child_count.set(self.child_count.get() + 1);
  }

  fn child_closed(&self) {
    let remaining = self.child_count.get().saturating_sub(1);
    self.child_count.set(remaining);
    if remaining == 0 && self.autoclose_on_last_child.get() {
      close_inner(self);
    }
  }
}

fn close_inner<R>(inner: &Inner<R>) {
  if inner.closed.replace(true) {
    return;
  }
  inner.resource.borrow_mut().take();
  if let Some(parent) = &inner.parent {
    parent.child_closed();
  }
}

impl<R> Drop for Inner<R> {
  fn drop(&mut self) {
    if !self.closed.get() {
      if let Some(parent) = &self.parent {
        parent.child_closed();
      }
    }
  }
}

/// A handle over a readable resource, optionally chained to a parent
/// handle whose lifetime it participates in.
pub struct StreamHandle<R> {
  inner: Rc<Inner<R>>,
}

impl<R> Clone for StreamHandle<R> {
  fn clone(&self) -> Self {
    StreamHandle {
      inner: Rc::clone(&self.inner),
    }
  }
}

impl<R> StreamHandle<R> {
  /// Constructs a root handle with no parent.
  pub fn new(resource: R, name: impl Into<String>) -> Self {
    StreamHandle {
      inner: Rc::new(Inner {
        resource: RefCell::new(Some(resource)),
        parent: None,
        child_count: Cell::new(0),
        autoclose_on_last_child: Cell::new(false),
        closed: Cell::new(false),
        name: name.into(),
      }),
    }
  }

  /// Constructs a handle that is a child of `parent`; increments the
  /// parent's child counter.
  pub fn with_parent<P: 'static>(
    resource: R,
    parent: &StreamHandle<P>,
    name: impl Into<String>,
  ) -> Self {
    parent.inner.child_opened();
    StreamHandle {
      inner: Rc::new(Inner {
        resource: RefCell::new(Some(resource)),
        parent: Some(Rc::clone(&parent.inner) as Rc<dyn Parent>),
        child_count: Cell::new(0),
        autoclose_on_last_child: Cell::new(false),
        closed: Cell::new(false),
        name: name.into(),
      }),
    }
  }

  pub fn name(&self) -> &str {
    &self.inner.name
  }

  pub fn is_closed(&self) -> bool {
    self.inner.closed.get()
  }

  /// Idempotent close: drops the underlying resource and, if this is
  /// the last live child of an autoclose parent, closes the parent too.
  pub fn close(&self) {
    close_inner(&self.inner);
  }

  /// Arms `autoclose_on_last_child`; closes immediately if there are no
  /// live children right now.
  pub fn autoclose(&self) {
    self.inner.autoclose_on_last_child.set(true);
    if self.inner.child_count.get() == 0 {
      self.close();
    }
  }
}

impl<R: Read> StreamHandle<R> {
  /// Reads the resource to exhaustion and closes it. A zero-length read
  /// is reported so that leaf decoders can propagate missing data as a
  /// null value.
  pub fn read_to_end_and_close(&self) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
      let mut resource = self.inner.resource.borrow_mut();
      if let Some(r) = resource.as_mut() {
        r.read_to_end(&mut buf)?;
      }
    }
    self.close();
    Ok(buf)
  }
}

impl<R: Read> Read for StreamHandle<R> {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    let mut resource = self.inner.resource.borrow_mut();
    match resource.as_mut() {
      Some(r) => r.read(buf),
      None => Ok(0),
    }
  }
}
