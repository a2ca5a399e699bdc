//! Per-step contact arena.
//!
//! The world owns one [`ContactArena`] per simulation step (or one shard per
//! worker) and passes it explicitly to every call that produces contacts.
//! Everything allocated during the step is released at once by
//! [`ContactArena::reset_all`]; capacity is kept for the next step.

use crate::contact::ContactPointInfo;
use crate::narrow::epa::EpaScratch;

/// Handle to a contact stored in a [`ContactArena`].
///
/// Only valid until the next [`ContactArena::reset_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContactId(usize);

impl ContactId {
    /// Dense index of the contact in its arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Scoped storage for contacts and algorithm scratch memory.
#[derive(Debug, Default)]
pub struct ContactArena {
    contacts: Vec<ContactPointInfo>,
    epa: EpaScratch,
}

impl ContactArena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an arena with room for `capacity` contacts.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            contacts: Vec::with_capacity(capacity),
            epa: EpaScratch::default(),
        }
    }

    /// Store a contact and return its handle.
    pub fn allocate(&mut self, contact: ContactPointInfo) -> ContactId {
        let id = ContactId(self.contacts.len());
        self.contacts.push(contact);
        id
    }

    /// Look up a contact.
    #[must_use]
    pub fn get(&self, id: ContactId) -> Option<&ContactPointInfo> {
        self.contacts.get(id.0)
    }

    /// Release every contact allocated since the last reset.
    pub fn reset_all(&mut self) {
        self.contacts.clear();
        self.epa.clear();
    }

    /// Number of live contacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Check if the arena holds no contacts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Number of contacts the arena can hold without reallocating.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.contacts.capacity()
    }

    /// Iterate over live contacts in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (ContactId, &ContactPointInfo)> {
        self.contacts
            .iter()
            .enumerate()
            .map(|(i, c)| (ContactId(i), c))
    }

    /// Live contacts in allocation order.
    #[must_use]
    pub fn as_slice(&self) -> &[ContactPointInfo] {
        &self.contacts
    }

    pub(crate) fn epa_scratch(&mut self) -> &mut EpaScratch {
        &mut self.epa
    }
}
