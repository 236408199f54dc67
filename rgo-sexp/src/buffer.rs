// Shared backing storage for atomic vectors.
//
// A Buffer is the contiguous element block of a vector. Cloning a Buffer
// aliases the same storage, which is how zero-copy views over boxed vectors
// are expressed: writes through any clone are visible to every other clone
// and to the owning vector.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::error::{SexpError, SexpResult};

pub struct Buffer<T>(Rc<RefCell<Vec<T>>>);

impl<T> Clone for Buffer<T> {
    fn clone(&self) -> Self {
        Buffer(Rc::clone(&self.0))
    }
}

impl<T: Copy + Default> Buffer<T> {
    pub(crate) fn zeroed(n: usize) -> Self {
        Buffer(Rc::new(RefCell::new(vec![T::default(); n])))
    }
}

impl<T: Copy> Buffer<T> {
    pub(crate) fn from_vec(v: Vec<T>) -> Self {
        Buffer(Rc::new(RefCell::new(v)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> SexpResult<T> {
        let v = self.0.borrow();
        v.get(index).copied().ok_or(SexpError::IndexOutOfRange { index, len: v.len() })
    }

    pub fn set(&self, index: usize, value: T) -> SexpResult<()> {
        let mut v = self.0.borrow_mut();
        let len = v.len();
        match v.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(SexpError::IndexOutOfRange { index, len }),
        }
    }

    /// Block copy of `src` into the buffer. Lengths must match.
    pub fn copy_from_slice(&self, src: &[T]) -> SexpResult<()> {
        let mut v = self.0.borrow_mut();
        if v.len() != src.len() {
            return Err(SexpError::LengthMismatch { expected: v.len(), found: src.len() });
        }
        v.copy_from_slice(src);
        Ok(())
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.0.borrow().clone()
    }

    pub fn as_slice(&self) -> Ref<'_, [T]> {
        Ref::map(self.0.borrow(), |v| v.as_slice())
    }

    pub fn as_mut_slice(&self) -> RefMut<'_, [T]> {
        RefMut::map(self.0.borrow_mut(), |v| v.as_mut_slice())
    }

    /// Whether two buffers alias the same storage.
    pub fn shares_storage(&self, other: &Buffer<T>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.borrow().iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_aliases_storage() {
        let a: Buffer<f64> = Buffer::zeroed(3);
        let b = a.clone();
        b.set(1, 2.5).unwrap();
        assert_eq!(a.get(1).unwrap(), 2.5);
        assert!(a.shares_storage(&b));
    }

    #[test]
    fn test_copy_from_slice_checks_length() {
        let a: Buffer<i32> = Buffer::zeroed(2);
        assert_eq!(
            a.copy_from_slice(&[1, 2, 3]),
            Err(SexpError::LengthMismatch { expected: 2, found: 3 })
        );
        a.copy_from_slice(&[7, 8]).unwrap();
        assert_eq!(a.to_vec(), vec![7, 8]);
    }

    #[test]
    fn test_out_of_range() {
        let a: Buffer<u8> = Buffer::from_vec(vec![1]);
        assert_eq!(a.get(4), Err(SexpError::IndexOutOfRange { index: 4, len: 1 }));
    }
}
