//! Tenancy checks shared by every school-scoped service.

use std::sync::Arc;

use bson::oid::ObjectId;
use tracing::warn;

use crate::model::school::School;
use crate::model::user::{AuthUser, Role};
use crate::repository::school_repo::SchoolRepository;
use crate::util::error::ServiceError;

/// Schools an actor may see
#[derive(Debug, Clone, PartialEq)]
pub enum SchoolScope {
    All,
    Only(Vec<ObjectId>),
}

impl SchoolScope {
    pub fn contains(&self, school_id: &ObjectId) -> bool {
        match self {
            SchoolScope::All => true,
            SchoolScope::Only(ids) => ids.contains(school_id),
        }
    }

    /// Repository filter for this scope, optionally narrowed to one
    /// requested school. Asking for a school outside the scope is a 403.
    pub fn narrow(&self, requested: Option<ObjectId>) -> Result<Option<Vec<ObjectId>>, ServiceError> {
        match (self, requested) {
            (_, Some(id)) if self.contains(&id) => Ok(Some(vec![id])),
            (_, Some(_)) => Err(ServiceError::Forbidden("You do not have access to this school".to_string())),
            (SchoolScope::All, None) => Ok(None),
            (SchoolScope::Only(ids), None) => Ok(Some(ids.clone())),
        }
    }
}

/// Whether `actor` may see `school`
pub fn can_see(actor: &AuthUser, school: &School) -> bool {
    match actor.role {
        Role::SuperAdmin => true,
        Role::Admin => school.admin_id == actor.id,
        Role::SubAdmin | Role::Teacher => actor.school_id.is_some() && actor.school_id == school.id,
    }
}

/// Whether `actor` owns `school` (may edit or delete the school itself)
pub fn owns(actor: &AuthUser, school: &School) -> bool {
    match actor.role {
        Role::SuperAdmin => true,
        Role::Admin => school.admin_id == actor.id,
        _ => false,
    }
}

pub struct AccessControl {
    school_repo: Arc<dyn SchoolRepository>,
}

impl AccessControl {
    pub fn new(school_repo: Arc<dyn SchoolRepository>) -> Self {
        AccessControl { school_repo }
    }

    pub async fn visible_schools(&self, actor: &AuthUser) -> Result<SchoolScope, ServiceError> {
        match actor.role {
            Role::SuperAdmin => Ok(SchoolScope::All),
            Role::Admin => Ok(SchoolScope::Only(self.school_repo.ids_for_admin(&actor.id).await?)),
            Role::SubAdmin | Role::Teacher => Ok(SchoolScope::Only(actor.school_id.into_iter().collect())),
        }
    }

    /// The school, provided it exists (404) and `actor` can see it (403)
    pub async fn ensure_can_read(&self, actor: &AuthUser, school_id: &ObjectId) -> Result<School, ServiceError> {
        let school = self
            .school_repo
            .find_by_id(school_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("School not found: {}", school_id)))?;
        if !can_see(actor, &school) {
            warn!(actor = %actor.id, school = %school_id, "School access denied");
            return Err(ServiceError::Forbidden("You do not have access to this school".to_string()));
        }
        Ok(school)
    }

    /// As `ensure_can_read`, and the actor is allowed to change school data
    pub async fn ensure_can_manage(&self, actor: &AuthUser, school_id: &ObjectId) -> Result<School, ServiceError> {
        let school = self.ensure_can_read(actor, school_id).await?;
        if !actor.has_any_role(&Role::MANAGERS) {
            return Err(ServiceError::Forbidden("Teachers cannot modify school data".to_string()));
        }
        Ok(school)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role, school_id: Option<ObjectId>) -> AuthUser {
        AuthUser { id: ObjectId::new(), email: "a@b.io".into(), role, school_id }
    }

    fn school(admin_id: ObjectId) -> School {
        School {
            id: Some(ObjectId::new()),
            name: "Hillside".into(),
            principal_name: "P".into(),
            admin_id,
            address: "1 Road".into(),
            contact_email: None,
            contact_phone: None,
            total_students: 0,
            total_teachers: 0,
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_can_see_by_role() {
        let admin = actor(Role::Admin, None);
        let owned = school(admin.id);
        let foreign = school(ObjectId::new());

        assert!(can_see(&admin, &owned));
        assert!(!can_see(&admin, &foreign));
        assert!(can_see(&actor(Role::SuperAdmin, None), &foreign));
        assert!(can_see(&actor(Role::Teacher, owned.id), &owned));
        assert!(!can_see(&actor(Role::Teacher, owned.id), &foreign));
        assert!(!can_see(&actor(Role::SubAdmin, None), &owned));
    }

    #[test]
    fn test_only_admins_own_schools() {
        let admin = actor(Role::Admin, None);
        let owned = school(admin.id);
        assert!(owns(&admin, &owned));
        assert!(!owns(&actor(Role::SubAdmin, owned.id), &owned));
    }

    #[test]
    fn test_scope_narrowing() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let scope = SchoolScope::Only(vec![a]);

        assert_eq!(scope.narrow(None).unwrap(), Some(vec![a]));
        assert_eq!(scope.narrow(Some(a)).unwrap(), Some(vec![a]));
        assert!(matches!(scope.narrow(Some(b)), Err(ServiceError::Forbidden(_))));
        assert_eq!(SchoolScope::All.narrow(None).unwrap(), None);
        assert_eq!(SchoolScope::All.narrow(Some(b)).unwrap(), Some(vec![b]));
    }
}
