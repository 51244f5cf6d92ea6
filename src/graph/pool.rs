//! Cell pool backing the up-edge lists and the pending queue.
//!
//! Both consumers need many short-lived, fixed-size link cells during the
//! steady-state burst of check-block arrivals. Freed cells go onto an
//! intrusive free-list inside a `Vec`-backed pool; the pool itself is shared
//! by every decoder on the thread through [`PoolHandle`] and is released when
//! the last handle drops.
//!
//! # Design
//!
//! - Cells are addressed by `u32` index with a `NIL` sentinel; no pointers,
//!   no unsafe code.
//! - `acquire` pops the free-list or appends, O(1) amortised; `release`
//!   pushes the free-list, O(1). Live cells are never moved or reordered.
//! - `reserve` makes a batch of upcoming `acquire` calls infallible so a
//!   multi-step mutation can pre-stage its allocation and stay a no-op when
//!   memory is unavailable.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::TryReserveError;
use std::rc::{Rc, Weak};

use crate::graph::NodeId;

/// Index of a cell inside the pool.
pub(crate) type CellRef = u32;

/// Sentinel marking the end of a cell chain.
pub(crate) const NIL: CellRef = CellRef::MAX;

#[derive(Debug, Clone, Copy)]
struct Cell {
    next: CellRef,
    value: NodeId,
}

/// Fixed-size cell allocator with an intrusive free-list.
#[derive(Debug)]
pub(crate) struct CellPool {
    cells: Vec<Cell>,
    free_head: CellRef,
    free_len: usize,
}

impl CellPool {
    const fn new() -> Self {
        Self {
            cells: Vec::new(),
            free_head: NIL,
            free_len: 0,
        }
    }

    /// Ensures the next `additional` acquires cannot allocate.
    pub(crate) fn reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        let spare = self.free_len + (self.cells.capacity() - self.cells.len());
        if additional > spare {
            self.cells.try_reserve(additional - spare)?;
        }
        Ok(())
    }

    /// Grows the backing storage without a fallible path (used at init where
    /// construction either succeeds or the process aborts on OOM).
    pub(crate) fn grow(&mut self, additional: usize) {
        let spare = self.free_len + (self.cells.capacity() - self.cells.len());
        if additional > spare {
            self.cells.reserve(additional - spare);
        }
    }

    /// Hands out a cell holding `value` with no successor.
    pub(crate) fn acquire(&mut self, value: NodeId) -> CellRef {
        if self.free_head == NIL {
            let index = CellRef::try_from(self.cells.len()).expect("cell pool index overflow");
            self.cells.push(Cell { next: NIL, value });
            index
        } else {
            let index = self.free_head;
            let cell = &mut self.cells[index as usize];
            self.free_head = cell.next;
            self.free_len -= 1;
            *cell = Cell { next: NIL, value };
            index
        }
    }

    /// Returns a cell to the free-list.
    pub(crate) fn release(&mut self, index: CellRef) {
        self.cells[index as usize] = Cell {
            next: self.free_head,
            value: 0,
        };
        self.free_head = index;
        self.free_len += 1;
    }

    pub(crate) fn value(&self, index: CellRef) -> NodeId {
        self.cells[index as usize].value
    }

    pub(crate) fn next(&self, index: CellRef) -> CellRef {
        self.cells[index as usize].next
    }

    pub(crate) fn set_next(&mut self, index: CellRef, next: CellRef) {
        self.cells[index as usize].next = next;
    }

    fn allocated(&self) -> usize {
        self.cells.len()
    }

    fn free(&self) -> usize {
        self.free_len
    }
}

thread_local! {
    static SHARED_POOL: RefCell<Weak<RefCell<CellPool>>> = const { RefCell::new(Weak::new()) };
}

/// Shared handle to a cell pool.
///
/// `shared()` returns the thread's common pool, creating it on first use and
/// reviving it whenever every previous handle has been dropped; the pool's
/// memory is released exactly when the last handle goes away. Handles are not
/// `Send`: decoders sharing a pool must live on one thread, or use
/// [`PoolHandle::private`] for an instance-owned pool.
#[derive(Debug, Clone)]
pub struct PoolHandle {
    inner: Rc<RefCell<CellPool>>,
}

impl PoolHandle {
    /// Returns the thread-wide shared pool.
    #[must_use]
    pub fn shared() -> Self {
        SHARED_POOL.with(|slot| {
            let mut slot = slot.borrow_mut();
            if let Some(inner) = slot.upgrade() {
                return Self { inner };
            }
            let inner = Rc::new(RefCell::new(CellPool::new()));
            *slot = Rc::downgrade(&inner);
            Self { inner }
        })
    }

    /// Creates a pool owned by a single decoder.
    #[must_use]
    pub fn private() -> Self {
        Self {
            inner: Rc::new(RefCell::new(CellPool::new())),
        }
    }

    pub(crate) fn borrow(&self) -> Ref<'_, CellPool> {
        self.inner.borrow()
    }

    pub(crate) fn borrow_mut(&self) -> RefMut<'_, CellPool> {
        self.inner.borrow_mut()
    }

    /// Number of handles (decoders plus clones) keeping the pool alive.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    /// Total cells the pool has ever handed out and still owns.
    #[must_use]
    pub fn allocated_cells(&self) -> usize {
        self.inner.borrow().allocated()
    }

    /// Cells currently parked on the free-list.
    #[must_use]
    pub fn free_cells(&self) -> usize {
        self.inner.borrow().free()
    }
}
