//! Virtual network identifier pool interface.
//!
//! The broker only hands out the pool instance; allocation itself belongs to
//! whatever implements [`VniAllocator`].

/// Numeric virtual network identifier.
pub type Vni = u32;

/// Opaque VNI pool.
pub trait VniAllocator: Send + Sync + std::fmt::Debug {
    /// Takes an identifier out of the pool.
    fn allocate(&self) -> Vni;

    /// Returns `vni` to the pool.
    fn release(&self, vni: Vni);
}
