/// Manages a pool of identifier values. Grabbing an id from the pool picks a number that has been
/// picked and returned before, or if none of those are available, the minimum value greater
/// than any existing id.
#[derive(Debug, Default)]
pub struct IdPool {
    next_index: i32,
    available_ids: Vec<i32>,
}

impl IdPool {
    /// Creates a new IdPool with the given initial capacity for returned ids.
    pub fn new(initial_capacity: usize) -> Self {
        IdPool {
            next_index: 0,
            available_ids: Vec::with_capacity(initial_capacity),
        }
    }

    /// Gets the highest value which any index claimed thus far could possibly have.
    /// -1 if nothing has ever been claimed.
    #[inline(always)]
    pub fn highest_possibly_claimed_id(&self) -> i32 {
        self.next_index - 1
    }

    /// Gets the number of previously returned ids waiting in the pool.
    #[inline(always)]
    pub fn available_id_count(&self) -> usize {
        self.available_ids.len()
    }

    /// Takes an id from the pool.
    #[inline(always)]
    pub fn take(&mut self) -> i32 {
        if let Some(id) = self.available_ids.pop() {
            id
        } else {
            let id = self.next_index;
            self.next_index += 1;
            id
        }
    }

    /// Returns an id to the pool.
    #[inline(always)]
    pub fn return_id(&mut self, id: i32) {
        debug_assert!(
            id >= 0 && id < self.next_index,
            "Returned ids must have been taken from this pool."
        );
        debug_assert!(
            !self.available_ids.contains(&id),
            "An id should never be returned to the pool twice."
        );
        self.available_ids.push(id);
    }

    /// Resets the IdPool. All previously taken ids may be handed out again.
    pub fn clear(&mut self) {
        self.next_index = 0;
        self.available_ids.clear();
    }
}
