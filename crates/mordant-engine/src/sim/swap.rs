//! Ping-pong ownership of a pair of simulation fields.

/// Resources that must be released explicitly before they are replaced.
pub trait Release {
    fn release(&self);
}

/// Read/write roles of the pair for the next dispatch.
#[derive(Debug)]
pub struct SwapView<'a, T> {
    /// Source of the dispatch; holds the newest data.
    pub read: &'a T,
    /// Target of the dispatch; must not be read by it.
    pub write: &'a T,
}

/// Two identically sized fields and the index of the current one.
///
/// Bind group `i` of the owning simulation reads `fields[i]` and writes
/// `fields[1 - i]`, so after a dispatch with bind group `index` the pair is
/// flipped and `fields[index]` is the freshly written field again.
#[derive(Debug)]
pub struct SwapPair<T> {
    fields: [T; 2],
    index: usize,
    generation: u64,
}

impl<T> SwapPair<T> {
    pub fn new(first: T, second: T) -> Self {
        Self {
            fields: [first, second],
            index: 0,
            generation: 0,
        }
    }

    /// Index of the field holding the newest data (0 or 1).
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Incremented on every reallocation; equal generations mean identical fields.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Roles while `index` is current; bind group `index` is built from this.
    #[inline]
    pub fn view_at(&self, index: usize) -> SwapView<'_, T> {
        let index = index & 1;
        SwapView {
            read: &self.fields[index],
            write: &self.fields[1 - index],
        }
    }

    /// The most recently written field.
    #[inline]
    pub fn current(&self) -> &T {
        &self.fields[self.index]
    }

    #[inline]
    pub fn get(&self, index: usize) -> &T {
        &self.fields[index & 1]
    }

    /// Marks the write target of the last dispatch as current.
    #[inline]
    pub fn flip(&mut self) {
        self.index = 1 - self.index;
    }
}

impl<T: Release> SwapPair<T> {
    /// Releases both fields, then installs the pair built by `make`.
    ///
    /// On success the index returns to 0 and the generation advances. If
    /// `make` fails the released fields stay behind and must be replaced by
    /// another successful call before the pair is dispatched again.
    pub fn reallocate<E>(&mut self, make: impl FnOnce() -> Result<[T; 2], E>) -> Result<(), E> {
        for field in &self.fields {
            field.release();
        }
        self.fields = make()?;
        self.index = 0;
        self.generation += 1;
        Ok(())
    }
}
