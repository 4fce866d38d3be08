// ============================================================================
// I/O Subsystem Module
// ============================================================================
pub mod dma;
pub mod ena;
pub mod hal;

#[allow(unused_imports)]
pub use dma::{CoherentBuffer, DmaAllocator, DmaRegion, DmaRing};
#[allow(unused_imports)]
pub use hal::{Clock, EnaHal, RegisterBar};
