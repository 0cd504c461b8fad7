mod common;

use bson::oid::ObjectId;
use common::TestContext;
use school_backend::dto::certificate_dto::{CertificateListQuery, CreateCertificateRequest, UpdateCertificateRequest};
use school_backend::model::class::SchoolClass;
use school_backend::model::log::LogAction;
use school_backend::model::student::Student;
use school_backend::model::user::{AuthUser, Role};
use school_backend::repository::class_repo::ClassRepository;
use school_backend::repository::student_repo::StudentRepository;
use school_backend::util::error::ServiceError;

const TEMPLATE: &str = "<h1>{{certificateName}}</h1><p>{{studentName}} ({{admissionNumber}}) of {{className}}, \
                        {{schoolName}}. House: {{House}}. Principal: {{school.principalName}}</p>";

fn create_request(school_id: ObjectId, name: &str, template: &str) -> CreateCertificateRequest {
    CreateCertificateRequest { name: name.to_string(), template: template.to_string(), school_id: school_id.to_hex() }
}

async fn student(ctx: &TestContext, school_id: ObjectId, class_id: Option<ObjectId>, last_name: &str) -> Student {
    let mut custom_fields = std::collections::BTreeMap::new();
    custom_fields.insert("House".to_string(), "Blue".to_string());
    ctx.students
        .insert(Student {
            id: None,
            first_name: "Amina".to_string(),
            last_name: last_name.to_string(),
            admission_number: "A-001".to_string(),
            date_of_birth: None,
            gender: None,
            guardian_name: None,
            phone: None,
            address: None,
            school_id,
            class_id,
            custom_fields,
            created_at: None,
            updated_at: None,
        })
        .await
        .unwrap()
}

async fn setup(ctx: &TestContext) -> (AuthUser, ObjectId) {
    let admin = ctx.user(Role::Admin, None).await;
    let school_id = ctx.school(&admin, "Hillside Academy").await.id.unwrap();
    (admin, school_id)
}

#[tokio::test]
async fn test_create_validates_template() {
    let ctx = TestContext::new();
    let (admin, school_id) = setup(&ctx).await;

    let err = ctx
        .services
        .certificates
        .create(&admin, create_request(school_id, "Broken", "<p>{{#if studentName}}</p>"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let created = ctx.services.certificates.create(&admin, create_request(school_id, "Merit", TEMPLATE)).await.unwrap();
    assert_eq!(created.created_by, admin.id.to_hex());

    let err = ctx
        .services
        .certificates
        .create(&admin, create_request(school_id, "merit", TEMPLATE))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn test_templates_that_fail_to_render_are_rejected_up_front() {
    let ctx = TestContext::new();
    let (admin, school_id) = setup(&ctx).await;

    for (i, template) in ["<p>{{formatDate dateOfBirth}}</p>", "<p>{{> footer}}</p>"].iter().enumerate() {
        let err = ctx
            .services
            .certificates
            .create(&admin, create_request(school_id, &format!("Draft {}", i), template))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)), "{} gave {:?}", template, err);
    }
    assert_eq!(ctx.certificates.0.lock().unwrap().len(), 0);

    let certificate = ctx.services.certificates.create(&admin, create_request(school_id, "Merit", TEMPLATE)).await.unwrap();
    let id = ObjectId::parse_str(&certificate.id).unwrap();
    let section = UpdateCertificateRequest { template: Some("{{#upper}}x{{/upper}}".to_string()), ..Default::default() };
    assert!(matches!(ctx.services.certificates.update(&admin, id, section).await, Err(ServiceError::InvalidInput(_))));

    let stored = ctx.services.certificates.get(&admin, id).await.unwrap();
    assert_eq!(stored.template, TEMPLATE);
}

#[tokio::test]
async fn test_generate_renders_student_context() {
    let ctx = TestContext::new();
    let (admin, school_id) = setup(&ctx).await;
    let class = ctx
        .classes
        .insert(SchoolClass {
            id: None,
            name: "Grade 5".to_string(),
            section: Some("B".to_string()),
            school_id,
            teacher_id: None,
            created_at: None,
            updated_at: None,
        })
        .await
        .unwrap();
    let amina = student(&ctx, school_id, class.id, "<Bello>").await;
    let teacher = ctx.user(Role::Teacher, Some(school_id)).await;
    let certificate = ctx.services.certificates.create(&admin, create_request(school_id, "Merit", TEMPLATE)).await.unwrap();
    let certificate_id = ObjectId::parse_str(&certificate.id).unwrap();

    let generated = ctx.services.certificates.generate(&teacher, certificate_id, amina.id.unwrap()).await.unwrap();

    assert_eq!(generated.student_name, "Amina <Bello>");
    assert!(generated.html.contains("<h1>Merit</h1>"));
    assert!(generated.html.contains("Amina &lt;Bello&gt; (A-001) of Grade 5 - B"));
    assert!(generated.html.contains("Hillside Academy. House: Blue."));
    assert!(generated.html.contains("Principal: Dr. Principal"));
    assert_eq!(generated.issued_on.len(), 10);

    let logs = ctx.logs.0.lock().unwrap();
    let last = logs.last().unwrap();
    assert_eq!(last.action, LogAction::Generate);
    assert_eq!(last.user_id, teacher.id);
    assert_eq!(last.student_id, amina.id);
}

#[tokio::test]
async fn test_generate_rejects_student_of_other_school() {
    let ctx = TestContext::new();
    let (admin, school_id) = setup(&ctx).await;
    let other_school = ctx.school(&admin, "Lakeside").await.id.unwrap();
    let outsider = student(&ctx, other_school, None, "Okafor").await;
    let certificate = ctx.services.certificates.create(&admin, create_request(school_id, "Merit", TEMPLATE)).await.unwrap();
    let certificate_id = ObjectId::parse_str(&certificate.id).unwrap();

    let err = ctx.services.certificates.generate(&admin, certificate_id, outsider.id.unwrap()).await.unwrap_err();
    assert_eq!(err, ServiceError::InvalidInput("Student and certificate belong to different schools".to_string()));

    let err = ctx.services.certificates.generate(&admin, certificate_id, ObjectId::new()).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = ctx.services.certificates.generate(&admin, ObjectId::new(), outsider.id.unwrap()).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_generate_denied_outside_scope() {
    let ctx = TestContext::new();
    let (admin, school_id) = setup(&ctx).await;
    let other_admin = ctx.user(Role::Admin, None).await;
    let amina = student(&ctx, school_id, None, "Bello").await;
    let certificate = ctx.services.certificates.create(&admin, create_request(school_id, "Merit", TEMPLATE)).await.unwrap();
    let certificate_id = ObjectId::parse_str(&certificate.id).unwrap();

    let err = ctx.services.certificates.generate(&other_admin, certificate_id, amina.id.unwrap()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn test_update_and_delete() {
    let ctx = TestContext::new();
    let (admin, school_id) = setup(&ctx).await;
    let teacher = ctx.user(Role::Teacher, Some(school_id)).await;
    let certificate = ctx.services.certificates.create(&admin, create_request(school_id, "Merit", TEMPLATE)).await.unwrap();
    let id = ObjectId::parse_str(&certificate.id).unwrap();

    let bad = UpdateCertificateRequest { template: Some("{{#each}}".to_string()), ..Default::default() };
    assert!(matches!(ctx.services.certificates.update(&admin, id, bad).await, Err(ServiceError::InvalidInput(_))));

    let rename = UpdateCertificateRequest { name: Some("Excellence".to_string()), ..Default::default() };
    assert!(matches!(
        ctx.services.certificates.update(&teacher, id, rename.clone()).await,
        Err(ServiceError::Forbidden(_))
    ));
    let updated = ctx.services.certificates.update(&admin, id, rename).await.unwrap();
    assert_eq!(updated.name, "Excellence");
    assert_eq!(updated.template, TEMPLATE);

    ctx.services.certificates.delete(&admin, id).await.unwrap();
    assert!(matches!(ctx.services.certificates.get(&admin, id).await, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn test_list_is_scoped() {
    let ctx = TestContext::new();
    let (admin, school_id) = setup(&ctx).await;
    let other_admin = ctx.user(Role::Admin, None).await;
    let other_school = ctx.school(&other_admin, "Riverside").await.id.unwrap();
    ctx.services.certificates.create(&admin, create_request(school_id, "Merit", TEMPLATE)).await.unwrap();
    ctx.services.certificates.create(&admin, create_request(school_id, "Transfer", TEMPLATE)).await.unwrap();
    ctx.services.certificates.create(&other_admin, create_request(other_school, "Merit", TEMPLATE)).await.unwrap();

    let page = ctx.services.certificates.list(&admin, CertificateListQuery::default()).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].name, "Transfer");

    let search = CertificateListQuery { search: Some("mer".to_string()), ..Default::default() };
    assert_eq!(ctx.services.certificates.list(&other_admin, search).await.unwrap().total, 1);
}
