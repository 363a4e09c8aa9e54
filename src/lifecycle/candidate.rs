use rand::Rng;

use crate::error::RoleError;
use crate::registry::MAX_COLOR;

/// Two colors offered to a member before anything is created remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub primary: u32,
    pub secondary: u32,
}

impl Candidate {
    pub fn new(primary: u32, secondary: u32) -> Self {
        Self { primary, secondary }
    }

    /// Draw both colors independently and uniformly from the 24-bit range.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            primary: rng.random_range(0..=MAX_COLOR),
            secondary: rng.random_range(0..=MAX_COLOR),
        }
    }

    pub fn validate(self) -> Result<Self, RoleError> {
        if self.primary > MAX_COLOR || self.secondary > MAX_COLOR {
            return Err(RoleError::InvalidCandidate {
                primary: self.primary,
                secondary: self.secondary,
            });
        }
        Ok(self)
    }

    /// `#RRGGBB` form of the primary color.
    pub fn primary_hex(self) -> String {
        hex(self.primary)
    }

    pub fn secondary_hex(self) -> String {
        hex(self.secondary)
    }
}

pub fn hex(color: u32) -> String {
    format!("#{:06X}", color & MAX_COLOR)
}
