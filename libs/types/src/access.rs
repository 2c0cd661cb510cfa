//! Access control model (spec §3, §4.B).
//!
//! A resource is created with a `ResourceMode`, which determines the
//! `AccessMask` each `Side` (client or server) is granted. The mask the
//! *client* side is granted matches the per-field `access` described in
//! spec §3; the server side is its complement for read/write and identical
//! for exec, per the translation table in §4.B.

use std::ops::{BitOr, BitOrAssign};

/// Which side of the CoAP conversation is performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The device itself, acting through the in-process registry API.
    Client,
    /// The remote device-management server, acting over CoAP.
    Server,
}

/// A set of permitted operations: read, write, and/or exec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessMask(u8);

impl AccessMask {
    pub const NONE: AccessMask = AccessMask(0);
    pub const READ: AccessMask = AccessMask(0b001);
    pub const WRITE: AccessMask = AccessMask(0b010);
    pub const EXEC: AccessMask = AccessMask(0b100);

    pub const fn can_read(self) -> bool {
        self.0 & Self::READ.0 != 0
    }

    pub const fn can_write(self) -> bool {
        self.0 & Self::WRITE.0 != 0
    }

    pub const fn can_exec(self) -> bool {
        self.0 & Self::EXEC.0 != 0
    }
}

impl BitOr for AccessMask {
    type Output = AccessMask;
    fn bitor(self, rhs: Self) -> Self::Output {
        AccessMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for AccessMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// The mode a resource is created with (spec §4.B `create_resource`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceMode {
    /// Client read/write, server read.
    Variable,
    /// Client read, server read/write.
    Setting,
    /// Both sides exec only.
    Command,
}

impl ResourceMode {
    /// Access mask granted to `side` under this mode, per the table in
    /// spec §4.B.
    pub const fn access_for(self, side: Side) -> AccessMask {
        match (self, side) {
            (ResourceMode::Variable, Side::Client) => {
                AccessMask(AccessMask::READ.0 | AccessMask::WRITE.0)
            }
            (ResourceMode::Variable, Side::Server) => AccessMask::READ,
            (ResourceMode::Setting, Side::Client) => AccessMask::READ,
            (ResourceMode::Setting, Side::Server) => {
                AccessMask(AccessMask::READ.0 | AccessMask::WRITE.0)
            }
            (ResourceMode::Command, _) => AccessMask::EXEC,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_mode_translation() {
        assert!(ResourceMode::Variable.access_for(Side::Client).can_read());
        assert!(ResourceMode::Variable.access_for(Side::Client).can_write());
        assert!(ResourceMode::Variable.access_for(Side::Server).can_read());
        assert!(!ResourceMode::Variable.access_for(Side::Server).can_write());
    }

    #[test]
    fn setting_mode_translation() {
        assert!(ResourceMode::Setting.access_for(Side::Client).can_read());
        assert!(!ResourceMode::Setting.access_for(Side::Client).can_write());
        assert!(ResourceMode::Setting.access_for(Side::Server).can_write());
    }

    #[test]
    fn command_mode_translation() {
        assert!(ResourceMode::Command.access_for(Side::Client).can_exec());
        assert!(ResourceMode::Command.access_for(Side::Server).can_exec());
        assert!(!ResourceMode::Command.access_for(Side::Client).can_read());
    }
}
