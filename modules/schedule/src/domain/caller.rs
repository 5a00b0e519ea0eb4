use uuid::Uuid;

use crate::contract::model::{Role, User};
use crate::domain::error::DomainError;

/// Identity of the authenticated user making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), DomainError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(DomainError::Forbidden)
        }
    }
}

impl From<&User> for Caller {
    fn from(u: &User) -> Self {
        Self {
            user_id: u.id,
            role: u.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: Role) -> Caller {
        Caller {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn only_admins_pass_the_admin_gate() {
        assert!(caller(Role::Admin).require_admin().is_ok());
        assert!(matches!(
            caller(Role::Student).require_admin(),
            Err(DomainError::Forbidden)
        ));
    }
}
