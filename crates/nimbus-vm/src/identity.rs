//! Generated identities for Windows VMs
//!
//! Identity generation is injected into the orchestrator so the pipeline
//! stays deterministic under test.

use uuid::Uuid;

/// Supplies administrator credentials and computer names for Windows VMs.
pub trait IdentityProvider: Send + Sync {
    /// NetBIOS-safe computer name, at most 15 characters.
    fn windows_computer_name(&self) -> String;

    /// Admin account name, at most 20 characters.
    fn windows_admin_username(&self) -> String;

    fn windows_admin_password(&self) -> String;
}

/// Derives throwaway identities from random UUIDs.
#[derive(Debug, Default)]
pub struct RandomIdentity;

impl IdentityProvider for RandomIdentity {
    fn windows_computer_name(&self) -> String {
        format!("nim-{}", &Uuid::new_v4().simple().to_string()[..11])
    }

    fn windows_admin_username(&self) -> String {
        let mut name = Uuid::new_v4().simple().to_string();
        name.truncate(20);
        name
    }

    fn windows_admin_password(&self) -> String {
        // Mixed-case prefix satisfies password complexity classes.
        format!("Np0!{}", Uuid::new_v4().simple())
    }
}
