//! In-memory container fake for pipeline tests

use super::RomContainer;
use crate::error::{Error, Result};

/// Step at which [`MockContainer`] should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Extract,
    Store,
    Rebuild,
}

#[derive(Debug, Clone, Default)]
pub struct MockContainer {
    pub region: Vec<u8>,
    pub fail_at: Option<MockFailure>,
    pub stored: bool,
    pub rebuilt: bool,
}

impl MockContainer {
    pub fn new(region: Vec<u8>) -> Self {
        Self {
            region,
            ..Default::default()
        }
    }

    pub fn failing_at(mut self, step: MockFailure) -> Self {
        self.fail_at = Some(step);
        self
    }

    fn check(&self, step: MockFailure) -> Result<()> {
        if self.fail_at == Some(step) {
            return Err(Error::Container(format!("mock failure at {:?}", step)));
        }
        Ok(())
    }
}

impl RomContainer for MockContainer {
    fn executable_region(&mut self) -> Result<Vec<u8>> {
        self.check(MockFailure::Extract)?;
        Ok(self.region.clone())
    }

    fn set_executable_region(&mut self, region: Vec<u8>) -> Result<()> {
        self.check(MockFailure::Store)?;
        self.region = region;
        self.stored = true;
        Ok(())
    }

    fn rebuild(&mut self) -> Result<()> {
        self.check(MockFailure::Rebuild)?;
        self.rebuilt = true;
        Ok(())
    }
}
