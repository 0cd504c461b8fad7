#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use bson::oid::ObjectId;

use school_backend::app::app::{build_router, Repositories, Services};
use school_backend::config::{AppConfig, JwtConfig};
use school_backend::model::certificate::Certificate;
use school_backend::model::class::SchoolClass;
use school_backend::model::log::Log;
use school_backend::model::school::School;
use school_backend::model::student::Student;
use school_backend::model::timestamp;
use school_backend::model::user::{AuthUser, Role, User};
use school_backend::repository::certificate_repo::{CertificateFilter, CertificateRepository};
use school_backend::repository::class_repo::{ClassFilter, ClassRepository};
use school_backend::repository::log_repo::{LogFilter, LogRepository};
use school_backend::repository::repository_error::{RepositoryError, RepositoryResult};
use school_backend::repository::school_repo::{SchoolFilter, SchoolRepository};
use school_backend::repository::student_repo::{StudentFilter, StudentRepository};
use school_backend::repository::user_repo::{UserFilter, UserRepository};
use school_backend::util::jwt::{JwtTokenUtils, JwtTokenUtilsImpl, TokenSubject};
use school_backend::util::pagination::PageRequest;
use school_backend::util::password::{PasswordUtils, PasswordUtilsImpl};

pub const PASSWORD: &str = "Passw0rd!";
pub const IMPORT_MAX_ROWS: usize = 50;

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

fn in_scope(ids: &Option<Vec<ObjectId>>, id: Option<ObjectId>) -> bool {
    match ids {
        None => true,
        Some(ids) => id.map(|id| ids.contains(&id)).unwrap_or(false),
    }
}

/// Newest first, then one page
fn paginate<T: Clone>(matching: Vec<T>, page: PageRequest) -> (Vec<T>, u64) {
    let total = matching.len() as u64;
    let items = matching
        .into_iter()
        .rev()
        .skip(page.skip() as usize)
        .take(page.limit as usize)
        .collect();
    (items, total)
}

fn stamp(id: &mut Option<ObjectId>, created: &mut Option<String>, updated: &mut Option<String>) {
    *id = Some(ObjectId::new());
    let now = timestamp();
    *created = Some(now.clone());
    *updated = Some(now);
}

#[derive(Default)]
pub struct MemSchools(pub Mutex<Vec<School>>);

#[async_trait]
impl SchoolRepository for MemSchools {
    async fn insert(&self, mut school: School) -> RepositoryResult<School> {
        let mut schools = self.0.lock().unwrap();
        if schools.iter().any(|s| s.admin_id == school.admin_id && s.name.eq_ignore_ascii_case(&school.name)) {
            return Err(RepositoryError::already_exists("school name"));
        }
        stamp(&mut school.id, &mut school.created_at, &mut school.updated_at);
        schools.push(school.clone());
        Ok(school)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<School>> {
        Ok(self.0.lock().unwrap().iter().find(|s| s.id == Some(*id)).cloned())
    }

    async fn find_by_name(&self, admin_id: &ObjectId, name: &str) -> RepositoryResult<Option<School>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.admin_id == *admin_id && s.name.eq_ignore_ascii_case(name.trim()))
            .cloned())
    }

    async fn ids_for_admin(&self, admin_id: &ObjectId) -> RepositoryResult<Vec<ObjectId>> {
        Ok(self.0.lock().unwrap().iter().filter(|s| s.admin_id == *admin_id).filter_map(|s| s.id).collect())
    }

    async fn list(&self, filter: &SchoolFilter, page: PageRequest) -> RepositoryResult<(Vec<School>, u64)> {
        let matching = self
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|s| in_scope(&filter.ids, s.id))
            .filter(|s| filter.is_active.map(|a| s.is_active == a).unwrap_or(true))
            .filter(|s| {
                filter
                    .search
                    .as_deref()
                    .map(|q| contains_ci(&s.name, q) || contains_ci(&s.principal_name, q))
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        Ok(paginate(matching, page))
    }

    async fn update(&self, school: School) -> RepositoryResult<School> {
        let mut schools = self.0.lock().unwrap();
        let existing = schools
            .iter_mut()
            .find(|s| s.id == school.id)
            .ok_or_else(|| RepositoryError::not_found("school"))?;
        let (students, teachers) = (existing.total_students, existing.total_teachers);
        *existing = School { total_students: students, total_teachers: teachers, ..school };
        Ok(existing.clone())
    }

    async fn delete(&self, id: &ObjectId) -> RepositoryResult<()> {
        let mut schools = self.0.lock().unwrap();
        let before = schools.len();
        schools.retain(|s| s.id != Some(*id));
        if schools.len() == before {
            return Err(RepositoryError::not_found("school"));
        }
        Ok(())
    }

    async fn adjust_counters(&self, id: &ObjectId, students: i64, teachers: i64) -> RepositoryResult<()> {
        let mut schools = self.0.lock().unwrap();
        let school = schools
            .iter_mut()
            .find(|s| s.id == Some(*id))
            .ok_or_else(|| RepositoryError::not_found("school"))?;
        school.total_students += students;
        school.total_teachers += teachers;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemUsers(pub Mutex<Vec<User>>);

#[async_trait]
impl UserRepository for MemUsers {
    async fn insert(&self, mut user: User) -> RepositoryResult<User> {
        let mut users = self.0.lock().unwrap();
        user.email = user.email.trim().to_lowercase();
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::already_exists("email"));
        }
        stamp(&mut user.id, &mut user.created_at, &mut user.updated_at);
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>> {
        Ok(self.0.lock().unwrap().iter().find(|u| u.id == Some(*id)).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self.0.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn list(&self, filter: &UserFilter, page: PageRequest) -> RepositoryResult<(Vec<User>, u64)> {
        let matching = self
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|u| in_scope(&filter.school_ids, u.school_id))
            .filter(|u| filter.role.map(|r| u.role == r).unwrap_or(true))
            .filter(|u| {
                filter.search.as_deref().map(|q| contains_ci(&u.name, q) || contains_ci(&u.email, q)).unwrap_or(true)
            })
            .cloned()
            .collect();
        Ok(paginate(matching, page))
    }

    async fn update(&self, mut user: User) -> RepositoryResult<User> {
        user.email = user.email.trim().to_lowercase();
        let mut users = self.0.lock().unwrap();
        let existing = users.iter_mut().find(|u| u.id == user.id).ok_or_else(|| RepositoryError::not_found("user"))?;
        *existing = user.clone();
        Ok(user)
    }

    async fn delete(&self, id: &ObjectId) -> RepositoryResult<()> {
        let mut users = self.0.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != Some(*id));
        if users.len() == before {
            return Err(RepositoryError::not_found("user"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemStudents(pub Mutex<Vec<Student>>);

#[async_trait]
impl StudentRepository for MemStudents {
    async fn insert(&self, mut student: Student) -> RepositoryResult<Student> {
        stamp(&mut student.id, &mut student.created_at, &mut student.updated_at);
        self.0.lock().unwrap().push(student.clone());
        Ok(student)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Student>> {
        Ok(self.0.lock().unwrap().iter().find(|s| s.id == Some(*id)).cloned())
    }

    async fn find_by_admission_number(&self, school_id: &ObjectId, admission_number: &str) -> RepositoryResult<Option<Student>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.school_id == *school_id && s.admission_number.eq_ignore_ascii_case(admission_number.trim()))
            .cloned())
    }

    async fn list(&self, filter: &StudentFilter, page: PageRequest) -> RepositoryResult<(Vec<Student>, u64)> {
        let matching = self
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|s| in_scope(&filter.school_ids, Some(s.school_id)))
            .filter(|s| filter.class_id.map(|c| s.class_id == Some(c)).unwrap_or(true))
            .filter(|s| {
                filter
                    .search
                    .as_deref()
                    .map(|q| {
                        contains_ci(&s.first_name, q) || contains_ci(&s.last_name, q) || contains_ci(&s.admission_number, q)
                    })
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        Ok(paginate(matching, page))
    }

    async fn count_in_class(&self, class_id: &ObjectId) -> RepositoryResult<u64> {
        Ok(self.0.lock().unwrap().iter().filter(|s| s.class_id == Some(*class_id)).count() as u64)
    }

    async fn update(&self, student: Student) -> RepositoryResult<Student> {
        let mut students = self.0.lock().unwrap();
        let existing = students
            .iter_mut()
            .find(|s| s.id == student.id)
            .ok_or_else(|| RepositoryError::not_found("student"))?;
        *existing = student.clone();
        Ok(student)
    }

    async fn delete(&self, id: &ObjectId) -> RepositoryResult<()> {
        let mut students = self.0.lock().unwrap();
        let before = students.len();
        students.retain(|s| s.id != Some(*id));
        if students.len() == before {
            return Err(RepositoryError::not_found("student"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemClasses(pub Mutex<Vec<SchoolClass>>);

#[async_trait]
impl ClassRepository for MemClasses {
    async fn insert(&self, mut class: SchoolClass) -> RepositoryResult<SchoolClass> {
        stamp(&mut class.id, &mut class.created_at, &mut class.updated_at);
        self.0.lock().unwrap().push(class.clone());
        Ok(class)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<SchoolClass>> {
        Ok(self.0.lock().unwrap().iter().find(|c| c.id == Some(*id)).cloned())
    }

    async fn find_by_name(&self, school_id: &ObjectId, name: &str, section: Option<&str>) -> RepositoryResult<Option<SchoolClass>> {
        let section = section.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
        Ok(self
            .0
            .lock()
            .unwrap()
            .iter()
            .find(|c| {
                c.school_id == *school_id
                    && c.name.eq_ignore_ascii_case(name.trim())
                    && c.section.as_ref().map(|s| s.to_lowercase()) == section
            })
            .cloned())
    }

    async fn list(&self, filter: &ClassFilter, page: PageRequest) -> RepositoryResult<(Vec<SchoolClass>, u64)> {
        let matching = self
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|c| in_scope(&filter.school_ids, Some(c.school_id)))
            .filter(|c| filter.teacher_id.map(|t| c.teacher_id == Some(t)).unwrap_or(true))
            .filter(|c| filter.search.as_deref().map(|q| contains_ci(&c.name, q)).unwrap_or(true))
            .cloned()
            .collect();
        Ok(paginate(matching, page))
    }

    async fn update(&self, class: SchoolClass) -> RepositoryResult<SchoolClass> {
        let mut classes = self.0.lock().unwrap();
        let existing = classes.iter_mut().find(|c| c.id == class.id).ok_or_else(|| RepositoryError::not_found("class"))?;
        *existing = class.clone();
        Ok(class)
    }

    async fn delete(&self, id: &ObjectId) -> RepositoryResult<()> {
        let mut classes = self.0.lock().unwrap();
        let before = classes.len();
        classes.retain(|c| c.id != Some(*id));
        if classes.len() == before {
            return Err(RepositoryError::not_found("class"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemCertificates(pub Mutex<Vec<Certificate>>);

#[async_trait]
impl CertificateRepository for MemCertificates {
    async fn insert(&self, mut certificate: Certificate) -> RepositoryResult<Certificate> {
        stamp(&mut certificate.id, &mut certificate.created_at, &mut certificate.updated_at);
        self.0.lock().unwrap().push(certificate.clone());
        Ok(certificate)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Certificate>> {
        Ok(self.0.lock().unwrap().iter().find(|c| c.id == Some(*id)).cloned())
    }

    async fn find_by_name(&self, school_id: &ObjectId, name: &str) -> RepositoryResult<Option<Certificate>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.school_id == *school_id && c.name.eq_ignore_ascii_case(name.trim()))
            .cloned())
    }

    async fn list(&self, filter: &CertificateFilter, page: PageRequest) -> RepositoryResult<(Vec<Certificate>, u64)> {
        let matching = self
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|c| in_scope(&filter.school_ids, Some(c.school_id)))
            .filter(|c| filter.search.as_deref().map(|q| contains_ci(&c.name, q)).unwrap_or(true))
            .cloned()
            .collect();
        Ok(paginate(matching, page))
    }

    async fn update(&self, certificate: Certificate) -> RepositoryResult<Certificate> {
        let mut certificates = self.0.lock().unwrap();
        let existing = certificates
            .iter_mut()
            .find(|c| c.id == certificate.id)
            .ok_or_else(|| RepositoryError::not_found("certificate"))?;
        *existing = certificate.clone();
        Ok(certificate)
    }

    async fn delete(&self, id: &ObjectId) -> RepositoryResult<()> {
        let mut certificates = self.0.lock().unwrap();
        let before = certificates.len();
        certificates.retain(|c| c.id != Some(*id));
        if certificates.len() == before {
            return Err(RepositoryError::not_found("certificate"));
        }
        Ok(())
    }
}

/// Audit log store; `fail_writes` makes every insert return a connection error
#[derive(Default)]
pub struct MemLogs(pub Mutex<Vec<Log>>, pub AtomicBool);

impl MemLogs {
    pub fn fail_writes(&self) {
        self.1.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl LogRepository for MemLogs {
    async fn insert(&self, mut log: Log) -> RepositoryResult<Log> {
        if self.1.load(Ordering::SeqCst) {
            return Err(RepositoryError::connection("audit log store unavailable"));
        }
        log.id = Some(ObjectId::new());
        log.created_at = Some(timestamp());
        self.0.lock().unwrap().push(log.clone());
        Ok(log)
    }

    async fn list(&self, filter: &LogFilter, page: PageRequest) -> RepositoryResult<(Vec<Log>, u64)> {
        let matching = self
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|l| in_scope(&filter.school_ids, l.school_id))
            .filter(|l| filter.user_id.map(|u| l.user_id == u).unwrap_or(true))
            .filter(|l| filter.action.map(|a| l.action == a).unwrap_or(true))
            .cloned()
            .collect();
        Ok(paginate(matching, page))
    }
}

/// Services and router wired to in-memory repositories
pub struct TestContext {
    pub schools: Arc<MemSchools>,
    pub users: Arc<MemUsers>,
    pub students: Arc<MemStudents>,
    pub classes: Arc<MemClasses>,
    pub certificates: Arc<MemCertificates>,
    pub logs: Arc<MemLogs>,
    pub services: Services,
    pub router: Router,
    pub jwt: JwtTokenUtilsImpl,
}

impl TestContext {
    pub fn new() -> Self {
        let schools = Arc::new(MemSchools::default());
        let users = Arc::new(MemUsers::default());
        let students = Arc::new(MemStudents::default());
        let classes = Arc::new(MemClasses::default());
        let certificates = Arc::new(MemCertificates::default());
        let logs = Arc::new(MemLogs::default());
        let repos = Repositories {
            schools: schools.clone(),
            users: users.clone(),
            students: students.clone(),
            classes: classes.clone(),
            certificates: certificates.clone(),
            logs: logs.clone(),
        };
        let services = Services::new(&repos, JwtConfig::default(), IMPORT_MAX_ROWS);
        let config = AppConfig { import_max_bytes: 64 * 1024, ..AppConfig::default() };
        let router = build_router(&services, &config);

        TestContext {
            schools,
            users,
            students,
            classes,
            certificates,
            logs,
            services,
            router,
            jwt: JwtTokenUtilsImpl::new(JwtConfig::default()),
        }
    }

    /// Stores a user whose password is `PASSWORD`
    pub async fn user(&self, role: Role, school_id: Option<ObjectId>) -> AuthUser {
        let email = format!("{}-{}@school.test", role, ObjectId::new().to_hex());
        let user = self
            .users
            .insert(User {
                id: None,
                name: format!("Test {}", role),
                email,
                password_hash: PasswordUtilsImpl::hash_password(PASSWORD).unwrap(),
                role,
                school_id,
                is_active: true,
                created_at: None,
                updated_at: None,
            })
            .await
            .unwrap();
        AuthUser { id: user.id.unwrap(), email: user.email, role, school_id }
    }

    pub async fn school(&self, admin: &AuthUser, name: &str) -> School {
        self.schools
            .insert(School {
                id: None,
                name: name.to_string(),
                principal_name: "Dr. Principal".to_string(),
                admin_id: admin.id,
                address: "1 School Road".to_string(),
                contact_email: None,
                contact_phone: None,
                total_students: 0,
                total_teachers: 0,
                is_active: true,
                created_at: None,
                updated_at: None,
            })
            .await
            .unwrap()
    }

    pub async fn class(&self, school_id: ObjectId, name: &str) -> SchoolClass {
        self.classes
            .insert(SchoolClass {
                id: None,
                name: name.to_string(),
                section: None,
                school_id,
                teacher_id: None,
                created_at: None,
                updated_at: None,
            })
            .await
            .unwrap()
    }

    pub fn school_snapshot(&self, id: ObjectId) -> School {
        self.schools.0.lock().unwrap().iter().find(|s| s.id == Some(id)).cloned().unwrap()
    }

    pub fn log_count(&self) -> usize {
        self.logs.0.lock().unwrap().len()
    }

    pub fn token(&self, actor: &AuthUser) -> String {
        self.jwt
            .generate_access_token(&TokenSubject {
                user_id: actor.id.to_hex(),
                email: actor.email.clone(),
                role: actor.role,
                school_id: actor.school_id.map(|id| id.to_hex()),
            })
            .unwrap()
    }
}
