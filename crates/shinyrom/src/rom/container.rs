//! Contract between the patch pipeline and a structured ROM container.

use crate::error::Result;

/// A ROM container that wraps an executable region.
///
/// Implementations own decompression and re-encoding; callers only ever see
/// the decompressed region. All failures are reported as
/// [`Error::Container`](crate::Error::Container).
pub trait RomContainer {
    /// Materialize the decompressed executable region.
    fn executable_region(&mut self) -> Result<Vec<u8>>;

    /// Replace the executable region with a mutated copy.
    fn set_executable_region(&mut self, region: Vec<u8>) -> Result<()>;

    /// Re-encode the region and rebuild the container image it belongs to.
    fn rebuild(&mut self) -> Result<()>;
}
