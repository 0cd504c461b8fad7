use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use tracing::{info, instrument, warn};

use crate::dto::student_dto::{
    CreateStudentRequest, ImportReport, StudentListQuery, StudentResponse, UpdateStudentRequest,
};
use crate::model::log::LogAction;
use crate::model::student::Student;
use crate::model::user::AuthUser;
use crate::model::timestamp;
use crate::repository::class_repo::ClassRepository;
use crate::repository::repository_error::RepositoryError;
use crate::repository::school_repo::SchoolRepository;
use crate::repository::student_repo::{StudentFilter, StudentRepository};
use crate::service::access::AccessControl;
use crate::service::log_service::{LogEntry, LogService};
use crate::service::clean;
use crate::util::csv_import::{parse_date, parse_student_csv, RowError, StudentRow};
use crate::util::error::{parse_object_id, parse_optional_object_id, ServiceError};
use crate::util::pagination::Paginated;

#[async_trait]
pub trait StudentService: Send + Sync {
    async fn create(&self, actor: &AuthUser, request: CreateStudentRequest) -> Result<StudentResponse, ServiceError>;
    async fn get(&self, actor: &AuthUser, id: ObjectId) -> Result<StudentResponse, ServiceError>;
    async fn list(&self, actor: &AuthUser, query: StudentListQuery) -> Result<Paginated<StudentResponse>, ServiceError>;
    async fn update(&self, actor: &AuthUser, id: ObjectId, request: UpdateStudentRequest) -> Result<StudentResponse, ServiceError>;
    async fn delete(&self, actor: &AuthUser, id: ObjectId) -> Result<(), ServiceError>;
    /// Bulk-creates students from a CSV file; failing rows are reported, not fatal
    async fn import_csv(
        &self,
        actor: &AuthUser,
        school_id: ObjectId,
        class_id: Option<ObjectId>,
        data: &[u8],
    ) -> Result<ImportReport, ServiceError>;
}

pub struct StudentServiceImpl {
    student_repo: Arc<dyn StudentRepository>,
    class_repo: Arc<dyn ClassRepository>,
    school_repo: Arc<dyn SchoolRepository>,
    access: Arc<AccessControl>,
    log_service: Arc<dyn LogService>,
    import_max_rows: usize,
}

impl StudentServiceImpl {
    pub fn new(
        student_repo: Arc<dyn StudentRepository>,
        class_repo: Arc<dyn ClassRepository>,
        school_repo: Arc<dyn SchoolRepository>,
        access: Arc<AccessControl>,
        log_service: Arc<dyn LogService>,
        import_max_rows: usize,
    ) -> Self {
        Self { student_repo, class_repo, school_repo, access, log_service, import_max_rows }
    }

    async fn find(&self, id: &ObjectId) -> Result<Student, ServiceError> {
        self.student_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Student not found: {}", id)))
    }

    async fn ensure_class_in_school(&self, class_id: &ObjectId, school_id: &ObjectId) -> Result<(), ServiceError> {
        match self.class_repo.find_by_id(class_id).await? {
            Some(class) if class.school_id == *school_id => Ok(()),
            Some(_) => Err(ServiceError::InvalidInput("Class does not belong to this school".to_string())),
            None => Err(ServiceError::InvalidInput(format!("Class not found: {}", class_id))),
        }
    }

    async fn ensure_admission_free(
        &self,
        school_id: &ObjectId,
        admission_number: &str,
        except: Option<ObjectId>,
    ) -> Result<(), ServiceError> {
        match self.student_repo.find_by_admission_number(school_id, admission_number).await? {
            Some(existing) if existing.id != except => Err(ServiceError::Conflict(format!(
                "Admission number {} is already used in this school",
                admission_number
            ))),
            _ => Ok(()),
        }
    }

    /// Inserts one parsed CSV row, answering the row error on failure
    async fn import_row(
        &self,
        row: StudentRow,
        school_id: ObjectId,
        class_id: Option<ObjectId>,
        seen: &mut HashSet<String>,
    ) -> Result<(), RowError> {
        let key = row.admission_number.to_lowercase();
        if !seen.insert(key) {
            return Err(RowError::new(row.line, format!("Duplicate admission number {} in file", row.admission_number)));
        }
        match self.student_repo.find_by_admission_number(&school_id, &row.admission_number).await {
            Ok(Some(_)) => {
                return Err(RowError::new(
                    row.line,
                    format!("Admission number {} already exists", row.admission_number),
                ))
            }
            Ok(None) => {}
            Err(e) => return Err(RowError::new(row.line, format!("Lookup failed: {}", e))),
        }

        let line = row.line;
        let student = Student {
            id: None,
            first_name: row.first_name,
            last_name: row.last_name,
            admission_number: row.admission_number,
            date_of_birth: row.date_of_birth,
            gender: row.gender,
            guardian_name: row.guardian_name,
            phone: row.phone,
            address: row.address,
            school_id,
            class_id,
            custom_fields: row.custom_fields,
            created_at: None,
            updated_at: None,
        };
        match self.student_repo.insert(student).await {
            Ok(_) => Ok(()),
            Err(RepositoryError::AlreadyExists(_)) => Err(RowError::new(line, "Admission number already exists")),
            Err(e) => {
                warn!(line, "Failed to insert imported student: {}", e);
                Err(RowError::new(line, "Failed to save student"))
            }
        }
    }
}

fn validated_date(raw: Option<String>) -> Result<Option<String>, ServiceError> {
    match clean(raw) {
        Some(raw) => parse_date(&raw)
            .map(Some)
            .ok_or_else(|| ServiceError::InvalidInput("dateOfBirth must be a YYYY-MM-DD date".to_string())),
        None => Ok(None),
    }
}

#[async_trait]
impl StudentService for StudentServiceImpl {
    #[instrument(skip(self, actor, request), fields(actor = %actor.id, admission_number = %request.admission_number))]
    async fn create(&self, actor: &AuthUser, request: CreateStudentRequest) -> Result<StudentResponse, ServiceError> {
        let school_id = parse_object_id(&request.school_id, "school")?;
        let class_id = parse_optional_object_id(request.class_id.as_deref(), "class")?;
        self.access.ensure_can_manage(actor, &school_id).await?;
        if let Some(class_id) = &class_id {
            self.ensure_class_in_school(class_id, &school_id).await?;
        }

        let admission_number = request.admission_number.trim().to_string();
        self.ensure_admission_free(&school_id, &admission_number, None).await?;

        let student = self
            .student_repo
            .insert(Student {
                id: None,
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
                admission_number,
                date_of_birth: validated_date(request.date_of_birth)?,
                gender: clean(request.gender),
                guardian_name: clean(request.guardian_name),
                phone: clean(request.phone),
                address: clean(request.address),
                school_id,
                class_id,
                custom_fields: request.custom_fields,
                created_at: None,
                updated_at: None,
            })
            .await?;

        self.school_repo.adjust_counters(&school_id, 1, 0).await?;
        self.log_service
            .record(
                LogEntry::new(actor.id, LogAction::Create, format!("Created student {}", student.full_name()))
                    .school(Some(school_id))
                    .student(student.id),
            )
            .await;
        Ok(StudentResponse::from(student))
    }

    async fn get(&self, actor: &AuthUser, id: ObjectId) -> Result<StudentResponse, ServiceError> {
        let student = self.find(&id).await?;
        self.access.ensure_can_read(actor, &student.school_id).await?;
        Ok(StudentResponse::from(student))
    }

    #[instrument(skip(self, actor, query), fields(actor = %actor.id))]
    async fn list(&self, actor: &AuthUser, query: StudentListQuery) -> Result<Paginated<StudentResponse>, ServiceError> {
        let requested = parse_optional_object_id(query.school_id.as_deref(), "school")?;
        let scope = self.access.visible_schools(actor).await?;
        let filter = StudentFilter {
            school_ids: scope.narrow(requested)?,
            class_id: parse_optional_object_id(query.class_id.as_deref(), "class")?,
            search: clean(query.search.clone()),
        };
        let page = query.page_request();
        let (students, total) = self.student_repo.list(&filter, page).await?;
        Ok(Paginated::new(students, total, page).map(StudentResponse::from))
    }

    #[instrument(skip(self, actor, request), fields(actor = %actor.id, student = %id))]
    async fn update(&self, actor: &AuthUser, id: ObjectId, request: UpdateStudentRequest) -> Result<StudentResponse, ServiceError> {
        let mut student = self.find(&id).await?;
        self.access.ensure_can_manage(actor, &student.school_id).await?;

        if let Some(admission_number) = clean(request.admission_number) {
            if !admission_number.eq_ignore_ascii_case(&student.admission_number) {
                self.ensure_admission_free(&student.school_id, &admission_number, Some(id)).await?;
            }
            student.admission_number = admission_number;
        }
        if let Some(raw) = request.class_id.as_deref() {
            student.class_id = parse_optional_object_id(Some(raw), "class")?;
            if let Some(class_id) = &student.class_id {
                self.ensure_class_in_school(class_id, &student.school_id).await?;
            }
        }
        if request.date_of_birth.is_some() {
            student.date_of_birth = validated_date(request.date_of_birth)?;
        }
        if let Some(first_name) = clean(request.first_name) {
            student.first_name = first_name;
        }
        if let Some(last_name) = clean(request.last_name) {
            student.last_name = last_name;
        }
        if request.gender.is_some() {
            student.gender = clean(request.gender);
        }
        if request.guardian_name.is_some() {
            student.guardian_name = clean(request.guardian_name);
        }
        if request.phone.is_some() {
            student.phone = clean(request.phone);
        }
        if request.address.is_some() {
            student.address = clean(request.address);
        }
        if let Some(custom_fields) = request.custom_fields {
            student.custom_fields = custom_fields;
        }
        student.updated_at = Some(timestamp());

        let student = self.student_repo.update(student).await?;
        self.log_service
            .record(
                LogEntry::new(actor.id, LogAction::Update, format!("Updated student {}", student.full_name()))
                    .school(Some(student.school_id))
                    .student(student.id),
            )
            .await;
        Ok(StudentResponse::from(student))
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id, student = %id))]
    async fn delete(&self, actor: &AuthUser, id: ObjectId) -> Result<(), ServiceError> {
        let student = self.find(&id).await?;
        self.access.ensure_can_manage(actor, &student.school_id).await?;

        self.student_repo.delete(&id).await?;
        self.school_repo.adjust_counters(&student.school_id, -1, 0).await?;
        self.log_service
            .record(
                LogEntry::new(actor.id, LogAction::Delete, format!("Deleted student {}", student.full_name()))
                    .school(Some(student.school_id))
                    .student(Some(id)),
            )
            .await;
        Ok(())
    }

    #[instrument(skip(self, actor, data), fields(actor = %actor.id, school = %school_id, bytes = data.len()))]
    async fn import_csv(
        &self,
        actor: &AuthUser,
        school_id: ObjectId,
        class_id: Option<ObjectId>,
        data: &[u8],
    ) -> Result<ImportReport, ServiceError> {
        self.access.ensure_can_manage(actor, &school_id).await?;
        if let Some(class_id) = &class_id {
            self.ensure_class_in_school(class_id, &school_id).await?;
        }

        let rows = parse_student_csv(data, self.import_max_rows).map_err(|e| ServiceError::InvalidInput(e.to_string()))?;
        let total_rows = rows.len();
        let mut errors = Vec::new();
        let mut seen = HashSet::new();
        let mut imported = 0usize;

        for row in rows {
            let outcome = match row {
                Ok(row) => self.import_row(row, school_id, class_id, &mut seen).await,
                Err(row_error) => Err(row_error),
            };
            match outcome {
                Ok(()) => imported += 1,
                Err(row_error) => errors.push(row_error),
            }
        }

        if imported > 0 {
            self.school_repo.adjust_counters(&school_id, imported as i64, 0).await?;
        }
        let report = ImportReport { total_rows, imported, failed: errors.len(), errors };
        self.log_service
            .record(
                LogEntry::new(
                    actor.id,
                    LogAction::Import,
                    format!("Imported {} of {} students from CSV", report.imported, report.total_rows),
                )
                .school(Some(school_id)),
            )
            .await;
        info!(imported = report.imported, failed = report.failed, "CSV import finished");
        Ok(report)
    }
}
