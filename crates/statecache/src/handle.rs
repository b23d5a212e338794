use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Address of the object a reference points at, used as its identity.
pub(crate) fn address_of<T: ?Sized>(value: &T) -> usize {
    value as *const T as *const () as usize
}

/// Type-erased strong reference to a host object, compared by identity.
///
/// Records hold these so the compared object cannot be freed (and its address
/// reused by an unrelated object) while the record still refers to it.
#[derive(Clone)]
pub(crate) struct HandleRef(Arc<dyn Any + Send + Sync>);

impl HandleRef {
    pub(crate) fn new<T: Send + Sync + 'static>(handle: &Arc<T>) -> Self {
        let erased: Arc<dyn Any + Send + Sync> = handle.clone();
        Self(erased)
    }

    pub(crate) fn is<T: ?Sized>(&self, other: &T) -> bool {
        address_of(self.0.as_ref()) == address_of(other)
    }
}

impl fmt::Debug for HandleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandleRef({:#x})", address_of(self.0.as_ref()))
    }
}
