//! ROM containers: header classification and executable access.

mod blz;
mod container;
mod identity;
pub mod layout;
#[cfg(test)]
pub mod mock;
mod nds;

pub use container::RomContainer;
pub use identity::{ContainerKind, GameIdentity, classify};
pub use nds::{NdsRom, crc16};

#[cfg(test)]
pub use mock::{MockContainer, MockFailure};
#[cfg(test)]
pub(crate) use nds::tests as nds_fixtures;
